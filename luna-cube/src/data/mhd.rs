//! MetaImage (`.mhd` + `.raw`) 格式读写.
//!
//! header 是若干 `Key = Value` 文本行, 以 `ElementDataFile` 结尾. 向量类的值
//! (`DimSize`, `Offset`, `ElementSpacing`) 均按 `(x, y, z)` 记录, 数据区以 x
//! 变化最快的顺序存储, 正好对应 `(z, y, x)` 行优先数组.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use flate2::read::ZlibDecoder;
use itertools::Itertools;
use ndarray::Array3;

use super::{CtVolume, SpatialAttr};
use crate::error::{Error, FormatError, Result};
use crate::Vec3;

/// 体素存储类型.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ElementType {
    /// `MET_CHAR`, i8.
    Char,
    /// `MET_UCHAR`, u8.
    UChar,
    /// `MET_SHORT`, i16.
    Short,
    /// `MET_USHORT`, u16.
    UShort,
    /// `MET_INT`, i32.
    Int,
    /// `MET_UINT`, u32.
    UInt,
    /// `MET_FLOAT`, f32.
    Float,
    /// `MET_DOUBLE`, f64.
    Double,
}

impl ElementType {
    fn parse(s: &str) -> std::result::Result<Self, FormatError> {
        Ok(match s {
            "MET_CHAR" => Self::Char,
            "MET_UCHAR" => Self::UChar,
            "MET_SHORT" => Self::Short,
            "MET_USHORT" => Self::UShort,
            "MET_INT" => Self::Int,
            "MET_UINT" => Self::UInt,
            "MET_FLOAT" => Self::Float,
            "MET_DOUBLE" => Self::Double,
            other => return Err(FormatError::UnsupportedElementType(other.to_owned())),
        })
    }

    /// header 中的名称.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Char => "MET_CHAR",
            Self::UChar => "MET_UCHAR",
            Self::Short => "MET_SHORT",
            Self::UShort => "MET_USHORT",
            Self::Int => "MET_INT",
            Self::UInt => "MET_UINT",
            Self::Float => "MET_FLOAT",
            Self::Double => "MET_DOUBLE",
        }
    }

    /// 单个体素的字节数.
    pub const fn byte_len(&self) -> usize {
        match self {
            Self::Char | Self::UChar => 1,
            Self::Short | Self::UShort => 2,
            Self::Int | Self::UInt | Self::Float => 4,
            Self::Double => 8,
        }
    }

    /// 将数据区解码为 HU 值. 宽类型饱和转换, 浮点向零截断.
    fn decode<B: ByteOrder>(&self, bytes: &[u8]) -> Vec<i16> {
        let clamp_i64 = |v: i64| v.clamp(i16::MIN as i64, i16::MAX as i64) as i16;
        match self {
            Self::Char => bytes.iter().map(|b| *b as i8 as i16).collect(),
            Self::UChar => bytes.iter().map(|b| *b as i16).collect(),
            Self::Short => {
                let mut out = vec![0i16; bytes.len() / 2];
                B::read_i16_into(bytes, &mut out);
                out
            }
            Self::UShort => bytes
                .chunks_exact(2)
                .map(|c| clamp_i64(B::read_u16(c) as i64))
                .collect(),
            Self::Int => bytes
                .chunks_exact(4)
                .map(|c| clamp_i64(B::read_i32(c) as i64))
                .collect(),
            Self::UInt => bytes
                .chunks_exact(4)
                .map(|c| clamp_i64(B::read_u32(c) as i64))
                .collect(),
            // `as` 对浮点数饱和并向零截断, NaN 映射为 0.
            Self::Float => bytes
                .chunks_exact(4)
                .map(|c| B::read_f32(c) as i16)
                .collect(),
            Self::Double => bytes
                .chunks_exact(8)
                .map(|c| B::read_f64(c) as i16)
                .collect(),
        }
    }
}

/// 数据区位置.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataFile {
    /// `LOCAL`: 数据紧跟在 header 之后.
    Local,
    /// 相对于 header 所在目录的数据文件路径.
    External(PathBuf),
}

/// MetaImage header.
#[derive(Clone, Debug, PartialEq)]
pub struct MhdHeader {
    /// 各轴体素个数, `(x, y, z)`.
    pub dim_size: [usize; 3],
    /// 体素存储类型.
    pub element_type: ElementType,
    /// 体素间距, `(x, y, z)`.
    pub element_spacing: Vec3,
    /// 体素 `(0, 0, 0)` 的物理坐标, `(x, y, z)`.
    pub offset: Vec3,
    /// 数据区是否为大端序.
    pub msb: bool,
    /// 数据区是否经过 zlib 压缩.
    pub compressed: bool,
    /// 数据区开头需要跳过的字节数. `-1` 代表数据位于文件末尾.
    pub header_size: i64,
    /// 方向余弦矩阵, 行优先. 仅作为元数据保留.
    pub transform_matrix: Option<[f64; 9]>,
    /// 解剖方向, 如 `RAI`. 仅作为元数据保留.
    pub anatomical_orientation: Option<String>,
    /// 数据区位置.
    pub data_file: DataFile,
}

fn parse_values<T: std::str::FromStr>(
    key: &str,
    value: &str,
) -> std::result::Result<Vec<T>, FormatError> {
    value
        .split_whitespace()
        .map(|v| v.parse::<T>())
        .collect::<std::result::Result<Vec<T>, _>>()
        .map_err(|_| FormatError::InvalidValue {
            key: key.to_owned(),
            value: value.to_owned(),
        })
}

fn parse_array<T: std::str::FromStr + Copy, const N: usize>(
    key: &str,
    value: &str,
) -> std::result::Result<[T; N], FormatError> {
    let v = parse_values::<T>(key, value)?;
    <[T; N]>::try_from(v).map_err(|_| FormatError::InvalidValue {
        key: key.to_owned(),
        value: value.to_owned(),
    })
}

fn parse_bool(key: &str, value: &str) -> std::result::Result<bool, FormatError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(FormatError::InvalidValue {
            key: key.to_owned(),
            value: value.to_owned(),
        }),
    }
}

impl MhdHeader {
    /// 从文件开头解析 header. 返回 header 和 header 本身占用的字节数
    /// (即 `LOCAL` 数据区的起始位置).
    pub fn parse(bytes: &[u8]) -> std::result::Result<(Self, usize), FormatError> {
        let mut ndims = None;
        let mut dim_size = None;
        let mut element_type = None;
        let mut element_spacing = [1.0; 3];
        let mut offset = [0.0; 3];
        let mut msb = false;
        let mut compressed = false;
        let mut header_size = 0;
        let mut transform_matrix = None;
        let mut anatomical_orientation = None;
        let mut channels = 1;

        let mut pos = 0;
        let mut line_no = 0;
        while pos < bytes.len() {
            let end = bytes[pos..]
                .iter()
                .position(|b| *b == b'\n')
                .map_or(bytes.len(), |i| pos + i + 1);
            let line = String::from_utf8_lossy(&bytes[pos..end]);
            pos = end;
            line_no += 1;

            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or(FormatError::MalformedLine(line_no))?;
            let (key, value) = (key.trim(), value.trim());

            match key {
                "NDims" => ndims = Some(parse_array::<usize, 1>(key, value)?[0]),
                "DimSize" => dim_size = Some(parse_values::<usize>(key, value)?),
                "ElementType" => element_type = Some(ElementType::parse(value)?),
                "ElementSpacing" | "ElementSize" => element_spacing = parse_array(key, value)?,
                "Offset" | "Origin" | "Position" => offset = parse_array(key, value)?,
                "BinaryDataByteOrderMSB" | "ElementByteOrderMSB" => msb = parse_bool(key, value)?,
                "CompressedData" => compressed = parse_bool(key, value)?,
                "HeaderSize" => header_size = parse_array::<i64, 1>(key, value)?[0],
                "ElementNumberOfChannels" => channels = parse_array::<usize, 1>(key, value)?[0],
                "TransformMatrix" | "Rotation" | "Orientation" => {
                    transform_matrix = Some(parse_array(key, value)?)
                }
                "AnatomicalOrientation" => anatomical_orientation = Some(value.to_owned()),
                "ElementDataFile" => {
                    let ndims = ndims.ok_or(FormatError::MissingKey("NDims"))?;
                    if ndims != 3 {
                        return Err(FormatError::NotVolume(ndims));
                    }
                    if channels != 1 {
                        return Err(FormatError::MultiChannel(channels));
                    }
                    let data_file = match value {
                        "LOCAL" | "Local" | "local" => DataFile::Local,
                        name => DataFile::External(PathBuf::from(name)),
                    };
                    let dims = dim_size.ok_or(FormatError::MissingKey("DimSize"))?;
                    let dim_size = <[usize; 3]>::try_from(dims).map_err(|d| {
                        FormatError::InvalidValue {
                            key: "DimSize".to_owned(),
                            value: d.iter().join(" "),
                        }
                    })?;
                    let header = Self {
                        dim_size,
                        element_type: element_type
                            .ok_or(FormatError::MissingKey("ElementType"))?,
                        element_spacing,
                        offset,
                        msb,
                        compressed,
                        header_size,
                        transform_matrix,
                        anatomical_orientation,
                        data_file,
                    };
                    return Ok((header, pos));
                }
                // ObjectType, BinaryData, CenterOfRotation 等与体数据无关.
                _ => {}
            }
        }
        Err(FormatError::MissingKey("ElementDataFile"))
    }

    /// `(z, y, x)` 形状.
    #[inline]
    pub fn shape(&self) -> (usize, usize, usize) {
        let [x, y, z] = self.dim_size;
        (z, y, x)
    }

    /// `(z, y, x)` 顺序的 origin.
    #[inline]
    pub fn origin_zyx(&self) -> Vec3 {
        let [x, y, z] = self.offset;
        [z, y, x]
    }

    /// `(z, y, x)` 顺序的 spacing.
    #[inline]
    pub fn spacing_zyx(&self) -> Vec3 {
        let [x, y, z] = self.element_spacing;
        [z, y, x]
    }

    /// 解压后 (或不压缩时) 数据区应有的字节数. 溢出时返回 `None`.
    #[inline]
    pub fn payload_len(&self) -> Option<usize> {
        self.dim_size
            .iter()
            .try_fold(self.element_type.byte_len(), |acc, n| acc.checked_mul(*n))
    }

    /// 从原始数据区中截取体素字节.
    ///
    /// `HeaderSize` 作用于文件中的原始字节, 先跳过再解压.
    fn locate_payload(&self, raw: Vec<u8>) -> std::result::Result<Vec<u8>, FormatError> {
        let expected = self.payload_len().ok_or_else(|| FormatError::InvalidValue {
            key: "DimSize".to_owned(),
            value: self.dim_size.iter().join(" "),
        })?;

        let skipped = match self.header_size {
            n if n > 0 => raw.get(n as usize..).unwrap_or_default(),
            _ => raw.as_slice(),
        };
        let body = if self.compressed {
            // 最多读取 `expected + 1` 字节.
            let mut out = Vec::new();
            ZlibDecoder::new(skipped)
                .take((expected as u64).saturating_add(1))
                .read_to_end(&mut out)
                .map_err(|_| FormatError::InvalidValue {
                    key: "CompressedData".to_owned(),
                    value: "True".to_owned(),
                })?;
            out
        } else if self.header_size == -1 && skipped.len() >= expected {
            skipped[skipped.len() - expected..].to_vec()
        } else {
            skipped.to_vec()
        };

        if body.len() != expected {
            return Err(FormatError::PayloadSize {
                expected,
                actual: body.len(),
            });
        }
        Ok(body)
    }
}

/// 仅读取 `.mhd` header, 不读取数据区.
pub fn read_header(path: &Path) -> Result<MhdHeader> {
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    Ok(MhdHeader::parse(&bytes)?.0)
}

/// 读取 `.mhd` 文件对应的 3D CT 扫描.
pub fn read_volume(path: &Path) -> Result<CtVolume> {
    let mut bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    let (header, header_len) = MhdHeader::parse(&bytes)?;

    let raw = match &header.data_file {
        DataFile::Local => bytes.split_off(header_len),
        DataFile::External(name) => {
            let data_path = path.parent().unwrap_or(Path::new(".")).join(name);
            fs::read(&data_path).map_err(|e| Error::io(data_path, e))?
        }
    };
    let payload = header.locate_payload(raw)?;

    let values = if header.msb {
        header.element_type.decode::<BigEndian>(&payload)
    } else {
        header.element_type.decode::<LittleEndian>(&payload)
    };
    // 长度已在 `locate_payload` 中校验.
    let data = Array3::from_shape_vec(header.shape(), values).map_err(|_| {
        FormatError::PayloadSize {
            expected: payload.len(),
            actual: payload.len(),
        }
    })?;

    CtVolume::new(data, header.origin_zyx(), header.spacing_zyx())
}

/// 将 `volume` 写为 `path` (`.mhd`) 和同目录下同名的 `.raw` 文件.
///
/// 数据以小端序 `MET_SHORT` 无压缩存储.
pub fn write_volume(volume: &CtVolume, path: &Path) -> Result<()> {
    let raw_path = path.with_extension("raw");
    let raw_name = raw_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let (z, y, x) = volume.shape();
    let [oz, oy, ox] = volume.origin();
    let [sz, sy, sx] = volume.spacing();

    let header = format!(
        "ObjectType = Image\n\
         NDims = 3\n\
         BinaryData = True\n\
         BinaryDataByteOrderMSB = False\n\
         CompressedData = False\n\
         TransformMatrix = 1 0 0 0 1 0 0 0 1\n\
         Offset = {ox} {oy} {oz}\n\
         CenterOfRotation = 0 0 0\n\
         AnatomicalOrientation = RAI\n\
         ElementSpacing = {sx} {sy} {sz}\n\
         DimSize = {x} {y} {z}\n\
         ElementType = MET_SHORT\n\
         ElementDataFile = {raw_name}\n"
    );
    fs::write(path, header).map_err(|e| Error::io(path, e))?;

    let file = File::create(&raw_path).map_err(|e| Error::io(&raw_path, e))?;
    let mut w = BufWriter::new(file);
    for v in volume.data().iter() {
        w.write_i16::<LittleEndian>(*v)
            .map_err(|e| Error::io(&raw_path, e))?;
    }
    w.flush().map_err(|e| Error::io(&raw_path, e))?;
    Ok(())
}
