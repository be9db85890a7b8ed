//! 候选表解析.
//!
//! 候选表为 CSV 文本, 首行为表头, 之后每行依次为
//! `seriesuid, coordX, coordY, coordZ, class`. 字段可以带引号.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use itertools::Itertools;

use crate::consts::{ClassLabel, CANDIDATE_COLUMNS};
use crate::data::WorldCoord;
use crate::error::{Error, Result};

/// 候选表中的一条记录.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CandidateRecord {
    /// 源 CT 扫描的 series UID, 同时是 `.mhd` 文件的基本名.
    pub series_uid: String,
    /// 物理 x 坐标 (毫米).
    pub coord_x: f64,
    /// 物理 y 坐标 (毫米).
    pub coord_y: f64,
    /// 物理 z 坐标 (毫米).
    pub coord_z: f64,
    /// 类别.
    pub class_label: ClassLabel,
}

impl CandidateRecord {
    /// 候选的物理坐标.
    #[inline]
    pub fn world(&self) -> WorldCoord {
        WorldCoord::new(self.coord_x, self.coord_y, self.coord_z)
    }

    /// 类别的整数表示, 0 或 1.
    #[inline]
    pub fn label(&self) -> u8 {
        self.class_label.as_u8()
    }

    /// 解析一行. `line_no` 仅用于报错.
    fn from_record(row: &StringRecord, line_no: usize) -> Result<Self> {
        let Some((uid, x, y, z, class)) = row.iter().collect_tuple() else {
            return Err(Error::table(
                line_no,
                format!("expected {CANDIDATE_COLUMNS} columns, got {}", row.len()),
            ));
        };
        if uid.is_empty() {
            return Err(Error::table(line_no, "empty seriesuid"));
        }

        let coord = |name: &str, v: &str| {
            v.parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .ok_or_else(|| Error::table(line_no, format!("invalid {name} `{v}`")))
        };
        let class_label = class
            .parse::<u8>()
            .ok()
            .and_then(ClassLabel::from_u8)
            .ok_or_else(|| Error::table(line_no, format!("invalid class `{class}`")))?;

        Ok(Self {
            series_uid: uid.to_owned(),
            coord_x: coord("coordX", x)?,
            coord_y: coord("coordY", y)?,
            coord_z: coord("coordZ", z)?,
            class_label,
        })
    }
}

/// 出错行号. 无法定位时为 0.
#[inline]
fn error_line(e: &csv::Error) -> usize {
    e.position().map_or(0, |p| p.line() as usize)
}

/// 从 `reader` 解析候选表. 首行视为表头并丢弃, 空行被跳过.
///
/// 任何一行格式错误都会使整个解析失败.
pub fn read_table<R: Read>(reader: R) -> Result<Vec<CandidateRecord>> {
    let mut table = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    let mut row = StringRecord::new();
    loop {
        match table.read_record(&mut row) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => return Err(Error::table(error_line(&e), e.to_string())),
        }
        let line_no = row.position().map_or(0, |p| p.line() as usize);
        rows.push(CandidateRecord::from_record(&row, line_no)?);
    }
    Ok(rows)
}

/// 打开 `path` 处的候选表并解析, 见 [`read_table`].
pub fn parse_table<P: AsRef<Path>>(path: P) -> Result<Vec<CandidateRecord>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    read_table(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "seriesuid,coordX,coordY,coordZ,class\n\
        1.3.6.1.4.1.14519.5.2.1.6279.6001.100225287222365663678666836860,-56.08,-67.85,-311.92,0\n\
        1.3.6.1.4.1.14519.5.2.1.6279.6001.100225287222365663678666836860,53.21,-244.41,-245.17,1\n\
        \n\
        B,1e1,2,3,0\n";

    #[test]
    fn test_read_table() {
        let rows = read_table(TABLE.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0].series_uid,
            "1.3.6.1.4.1.14519.5.2.1.6279.6001.100225287222365663678666836860"
        );
        assert_eq!(rows[0].world(), WorldCoord::new(-56.08, -67.85, -311.92));
        assert_eq!(rows[0].world().to_zyx(), [-311.92, -67.85, -56.08]);
        assert_eq!(rows[0].label(), 0);
        assert_eq!(rows[1].class_label, ClassLabel::Positive);
        assert_eq!(rows[2].series_uid, "B");
        assert_eq!(rows[2].coord_x, 10.0);
    }

    #[test]
    fn test_header_only() {
        assert!(read_table("seriesuid,coordX,coordY,coordZ,class\n".as_bytes())
            .unwrap()
            .is_empty());
        assert!(read_table("".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_header_is_discarded_unchecked() {
        // 表头内容不做校验.
        let rows = read_table("anything\nA,1,2,3,1\n".as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
    }

    fn table_error_line(s: &str) -> Option<usize> {
        match read_table(s.as_bytes()) {
            Err(Error::Table { line, .. }) => Some(line),
            _ => None,
        }
    }

    #[test]
    fn test_malformed_rows() {
        let h = "seriesuid,coordX,coordY,coordZ,class\n";
        assert_eq!(table_error_line(&format!("{h}A,1,2,3\n")), Some(2));
        assert_eq!(table_error_line(&format!("{h}A,1,2,3,0,9\n")), Some(2));
        assert_eq!(table_error_line(&format!("{h}A,1,2,3,0\nA,x,2,3,0\n")), Some(3));
        assert_eq!(table_error_line(&format!("{h}A,1,2,nan,0\n")), Some(2));
        assert_eq!(table_error_line(&format!("{h}A,1,2,3,2\n")), Some(2));
        assert_eq!(table_error_line(&format!("{h}A,1,2,3,-1\n")), Some(2));
        assert_eq!(table_error_line(&format!("{h},1,2,3,0\n")), Some(2));
    }

    #[test]
    fn test_quoted_fields() {
        let h = "seriesuid,coordX,coordY,coordZ,class\n";
        let rows = read_table(format!("{h}\"A\",50,50,25,1\n\"B,C\", -1.5 ,\"2\",3,0\n").as_bytes())
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].series_uid, "A");
        assert_eq!(rows[0].world(), WorldCoord::new(50.0, 50.0, 25.0));
        assert_eq!(rows[1].series_uid, "B,C");
        assert_eq!(rows[1].coord_x, -1.5);
        assert_eq!(rows[1].coord_y, 2.0);
    }

    #[test]
    fn test_crlf_line_endings() {
        let rows = read_table("seriesuid,coordX,coordY,coordZ,class\r\nA,1,2,3,1\r\nB,4,5,6,0\r\n".as_bytes())
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].series_uid, "B");
        assert_eq!(rows[1].label(), 0);
    }

    #[test]
    fn test_parse_table_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            parse_table(dir.path().join("candidates.csv")),
            Err(Error::Io { .. })
        ));
    }
}
