//! Native NIfTI-1 reading/writing
//!
//! Minimal single-file NIfTI-1 (.nii / .nii.gz) codec built on `byteorder`
//! and `flate2`. Only the fields this pipeline needs are interpreted:
//! dimensions, datatype and voxel spacing. Orientation information
//! (qform/sform) is deliberately ignored.

use crate::error::{Error, Result};
use crate::volume::{Spacing, Volume, VoxelElement};
use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use num_traits::NumCast;
use std::any::TypeId;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

const HEADER_SIZE: usize = 348;
const MAGIC_OFFSET: usize = 344;
const DATA_OFFSET: u64 = 352;

/// NIfTI-1 datatype codes for the component types this pipeline handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    UInt8,
    Int16,
    UInt16,
    Int32,
    Float32,
    Float64,
}

impl DataType {
    fn from_code(code: i16) -> Result<Self> {
        match code {
            2 => Ok(DataType::UInt8),
            4 => Ok(DataType::Int16),
            8 => Ok(DataType::Int32),
            16 => Ok(DataType::Float32),
            64 => Ok(DataType::Float64),
            512 => Ok(DataType::UInt16),
            other => Err(Error::UnsupportedDataType(format!(
                "NIfTI datatype code {}",
                other
            ))),
        }
    }

    fn code(&self) -> i16 {
        match self {
            DataType::UInt8 => 2,
            DataType::Int16 => 4,
            DataType::Int32 => 8,
            DataType::Float32 => 16,
            DataType::Float64 => 64,
            DataType::UInt16 => 512,
        }
    }

    fn bitpix(&self) -> i16 {
        match self {
            DataType::UInt8 => 8,
            DataType::Int16 | DataType::UInt16 => 16,
            DataType::Int32 | DataType::Float32 => 32,
            DataType::Float64 => 64,
        }
    }

    fn byte_size(&self) -> usize {
        (self.bitpix() / 8) as usize
    }

    /// Datatype matching a Rust element type, if the format can store it
    pub fn of<T: VoxelElement>() -> Result<Self> {
        let id = TypeId::of::<T>();
        if id == TypeId::of::<u8>() {
            Ok(DataType::UInt8)
        } else if id == TypeId::of::<i16>() {
            Ok(DataType::Int16)
        } else if id == TypeId::of::<u16>() {
            Ok(DataType::UInt16)
        } else if id == TypeId::of::<i32>() {
            Ok(DataType::Int32)
        } else if id == TypeId::of::<f32>() {
            Ok(DataType::Float32)
        } else if id == TypeId::of::<f64>() {
            Ok(DataType::Float64)
        } else {
            Err(Error::UnsupportedDataType(format!(
                "{}",
                std::any::type_name::<T>()
            )))
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DataType::UInt8 => "uint8",
            DataType::Int16 => "int16",
            DataType::UInt16 => "uint16",
            DataType::Int32 => "int32",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
        };
        f.write_str(name)
    }
}

/// Component type and dimensionality of a volume file, read before
/// the caller picks a working pixel type.
#[derive(Debug, Clone, Copy)]
pub struct VolumeInfo {
    pub data_type: DataType,
    pub ndim: usize,
}

struct Header {
    ndim: usize,
    nx: usize,
    ny: usize,
    nz: usize,
    data_type: DataType,
    spacing: Spacing,
    vox_offset: u64,
}

fn is_gz(path: &Path) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case("gz"))
}

fn open_reader(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path)?;
    if is_gz(path) {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

fn parse_header_with<B: ByteOrder>(buf: &[u8], path: &Path) -> Result<Header> {
    let ndim = B::read_i16(&buf[40..42]);
    if !(1..=7).contains(&ndim) {
        return Err(Error::Format(format!(
            "implausible dimension count {} in {}",
            ndim,
            path.display()
        )));
    }
    let dim = |i: usize| B::read_i16(&buf[40 + 2 * i..42 + 2 * i]).max(1) as usize;
    let datatype = DataType::from_code(B::read_i16(&buf[70..72]))?;
    let pixdim = |i: usize| B::read_f32(&buf[76 + 4 * i..80 + 4 * i]) as f64;
    // Some writers store zero or negative pixdims; fall back to 1mm.
    let axis = |i: usize| {
        let v = pixdim(i).abs();
        if v.is_finite() && v > 0.0 {
            v
        } else {
            1.0
        }
    };
    let spacing = Spacing::new(axis(1), axis(2), axis(3))?;
    let vox_offset = B::read_f32(&buf[108..112]) as u64;

    Ok(Header {
        ndim: ndim as usize,
        nx: dim(1),
        ny: dim(2),
        nz: dim(3),
        data_type: datatype,
        spacing,
        vox_offset: vox_offset.max(HEADER_SIZE as u64),
    })
}

fn read_header(reader: &mut dyn Read, path: &Path) -> Result<Header> {
    let mut buf = [0u8; HEADER_SIZE];
    reader
        .read_exact(&mut buf)
        .map_err(|_| Error::Format(format!("{} is too short for a NIfTI-1 header", path.display())))?;

    let magic = &buf[MAGIC_OFFSET..MAGIC_OFFSET + 3];
    if magic != b"n+1" && magic != b"ni1" {
        return Err(Error::Format(format!(
            "{} has no NIfTI-1 magic",
            path.display()
        )));
    }

    // Endianness is detected from the dim[0] range, as the format prescribes.
    let ndim_le = LittleEndian::read_i16(&buf[40..42]);
    if (1..=7).contains(&ndim_le) {
        parse_header_with::<LittleEndian>(&buf, path)
    } else {
        parse_header_with::<BigEndian>(&buf, path)
    }
}

/// Read the component type and dimensionality of a volume file.
///
/// Used once before generic dispatch; does not touch the voxel data.
pub fn read_volume_info<P: AsRef<Path>>(path: P) -> Result<VolumeInfo> {
    let path = path.as_ref();
    let mut reader = open_reader(path)?;
    let header = read_header(reader.as_mut(), path)?;
    Ok(VolumeInfo {
        data_type: header.data_type,
        ndim: header.ndim,
    })
}

fn cast_saturating<T: VoxelElement>(v: f64) -> T {
    <T as NumCast>::from(v).unwrap_or_else(|| {
        if v > 0.0 {
            T::max_value()
        } else {
            T::min_value()
        }
    })
}

fn decode_voxels<T: VoxelElement>(raw: &[u8], dtype: DataType, little: bool) -> Vec<T> {
    let n = raw.len() / dtype.byte_size();
    let mut out = Vec::with_capacity(n);
    macro_rules! decode {
        ($read:path, $size:expr) => {
            for i in 0..n {
                let v = $read(&raw[i * $size..(i + 1) * $size]) as f64;
                out.push(cast_saturating::<T>(v));
            }
        };
    }
    macro_rules! decode_all {
        ($b:ident) => {
            match dtype {
                DataType::UInt8 => {
                    for &b in raw {
                        out.push(cast_saturating::<T>(b as f64));
                    }
                }
                DataType::Int16 => decode!($b::read_i16, 2),
                DataType::UInt16 => decode!($b::read_u16, 2),
                DataType::Int32 => decode!($b::read_i32, 4),
                DataType::Float32 => decode!($b::read_f32, 4),
                DataType::Float64 => decode!($b::read_f64, 8),
            }
        };
    }
    if little {
        decode_all!(LittleEndian);
    } else {
        decode_all!(BigEndian);
    }
    out
}

/// Read a NIfTI-1 volume, casting the stored component type to `T`.
///
/// The file must describe a 3D volume; anything else is rejected before
/// any data is decoded.
pub fn read_volume<T: VoxelElement, P: AsRef<Path>>(path: P) -> Result<Volume<T>> {
    let path = path.as_ref();
    let mut reader = open_reader(path)?;

    let mut head_buf = [0u8; HEADER_SIZE];
    reader
        .read_exact(&mut head_buf)
        .map_err(|_| Error::Format(format!("{} is too short for a NIfTI-1 header", path.display())))?;
    let magic = &head_buf[MAGIC_OFFSET..MAGIC_OFFSET + 3];
    if magic != b"n+1" {
        return Err(Error::Format(format!(
            "{} is not a single-file NIfTI-1 image",
            path.display()
        )));
    }
    let ndim_le = LittleEndian::read_i16(&head_buf[40..42]);
    let little = (1..=7).contains(&ndim_le);
    let header = if little {
        parse_header_with::<LittleEndian>(&head_buf, path)?
    } else {
        parse_header_with::<BigEndian>(&head_buf, path)?
    };

    if header.ndim != 3 {
        return Err(Error::NotVolume {
            path: path.display().to_string(),
            ndim: header.ndim,
        });
    }

    // Skip the gap between header and voxel data
    let skip = header.vox_offset.saturating_sub(HEADER_SIZE as u64);
    std::io::copy(&mut reader.as_mut().take(skip), &mut std::io::sink())?;

    let voxels = header.nx * header.ny * header.nz;
    let mut raw = vec![0u8; voxels * header.data_type.byte_size()];
    reader.read_exact(&mut raw).map_err(|_| {
        Error::Format(format!(
            "{}: voxel data truncated (expected {} voxels)",
            path.display(),
            voxels
        ))
    })?;

    let data = decode_voxels::<T>(&raw, header.data_type, little);

    // File order is x-fastest, which matches (z, y, x) C-order exactly.
    let mut volume = Volume::from_vec(data, header.nz, header.ny, header.nx)?;
    volume.set_spacing(header.spacing);
    Ok(volume)
}

fn encode_header(
    volume_shape: (usize, usize, usize),
    spacing: &Spacing,
    dtype: DataType,
) -> Result<Vec<u8>> {
    let (nz, ny, nx) = volume_shape;
    // The dim fields are i16; anything larger cannot be represented.
    for (axis, n) in [("x", nx), ("y", ny), ("z", nz)] {
        if n > i16::MAX as usize {
            return Err(Error::Format(format!(
                "dimension {} = {} exceeds the NIfTI-1 limit of {}",
                axis,
                n,
                i16::MAX
            )));
        }
    }
    let mut buf = vec![0u8; HEADER_SIZE];
    LittleEndian::write_i32(&mut buf[0..4], HEADER_SIZE as i32);
    // dim[0..3]
    LittleEndian::write_i16(&mut buf[40..42], 3);
    LittleEndian::write_i16(&mut buf[42..44], nx as i16);
    LittleEndian::write_i16(&mut buf[44..46], ny as i16);
    LittleEndian::write_i16(&mut buf[46..48], nz as i16);
    for i in 4..8 {
        LittleEndian::write_i16(&mut buf[40 + 2 * i..42 + 2 * i], 1);
    }
    LittleEndian::write_i16(&mut buf[70..72], dtype.code());
    LittleEndian::write_i16(&mut buf[72..74], dtype.bitpix());
    // pixdim[0] is the qfac placeholder
    LittleEndian::write_f32(&mut buf[76..80], 1.0);
    LittleEndian::write_f32(&mut buf[80..84], spacing.x as f32);
    LittleEndian::write_f32(&mut buf[84..88], spacing.y as f32);
    LittleEndian::write_f32(&mut buf[88..92], spacing.z as f32);
    LittleEndian::write_f32(&mut buf[108..112], DATA_OFFSET as f32);
    // scl_slope = 1 so readers do not rescale
    LittleEndian::write_f32(&mut buf[112..116], 1.0);
    buf[MAGIC_OFFSET..MAGIC_OFFSET + 4].copy_from_slice(b"n+1\0");
    Ok(buf)
}

fn encode_voxels<T: VoxelElement, W: Write>(volume: &Volume<T>, dtype: DataType, w: &mut W) -> Result<()> {
    for &v in volume.data().iter() {
        let f = v.to_f64().unwrap_or(0.0);
        match dtype {
            DataType::UInt8 => w.write_u8(cast_saturating::<u8>(f))?,
            DataType::Int16 => w.write_i16::<LittleEndian>(cast_saturating::<i16>(f))?,
            DataType::UInt16 => w.write_u16::<LittleEndian>(cast_saturating::<u16>(f))?,
            DataType::Int32 => w.write_i32::<LittleEndian>(cast_saturating::<i32>(f))?,
            DataType::Float32 => w.write_f32::<LittleEndian>(f as f32)?,
            DataType::Float64 => w.write_f64::<LittleEndian>(f)?,
        }
    }
    Ok(())
}

/// Write a volume as a single-file NIfTI-1 image.
///
/// The component type is taken from `T`; gzip compression is applied when
/// the path ends in `.gz`.
pub fn write_volume<T: VoxelElement, P: AsRef<Path>>(volume: &Volume<T>, path: P) -> Result<()> {
    let path = path.as_ref();
    let dtype = DataType::of::<T>()?;
    let header = encode_header(volume.shape(), volume.spacing(), dtype)?;

    let mut sink: Box<dyn Write> = {
        let file = File::create(path)?;
        if is_gz(path) {
            Box::new(GzEncoder::new(file, Compression::default()))
        } else {
            Box::new(file)
        }
    };

    sink.write_all(&header)?;
    // Pad to vox_offset
    sink.write_all(&[0u8; (DATA_OFFSET as usize) - HEADER_SIZE])?;
    encode_voxels(volume, dtype, &mut sink)?;
    sink.flush()?;
    Ok(())
}
