//! 导出结果.

use crate::profile::Profile;
use std::io::{self, Write};
use std::path::PathBuf;

/// 将 `profile` 的结果写进 `w` 中.
fn describe_into<W: Write>(p: &Profile, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    #[inline]
    fn f64_to_display(f: Option<f64>) -> String {
        match f {
            Some(f) => format!("{f:.3}"),
            None => "/".to_string(),
        }
    }

    #[inline]
    fn u64_to_display(u: Option<u64>) -> String {
        match u {
            Some(u) => u.to_string(),
            None => "/".to_string(),
        }
    }

    writeln!(w, "Profile:")?;
    writeln!(w, "{S4}Candidates: {}", p.get_candidates())?;
    writeln!(w, "{S4}Extracted cubes: {}", p.get_extracted())?;
    writeln!(w, "{S4}Failed samples: {}", p.get_failed())?;
    writeln!(w, "{S4}Truncated cubes: {}", p.get_truncated())?;
    writeln!(w, "{S4}Positive cubes: {}", p.get_positives())?;
    writeln!(w, "{S4}Summed extraction time: {} ms", p.get_sample_time_ms())?;
    writeln!(
        w,
        "{S4}Average extraction time: {} ms",
        f64_to_display(p.get_avg_sample_time_ms())
    )?;
    writeln!(w, "{S4}Total machine time: {} ms", p.get_real_time_ms())?;
    let t = p.get_most_time_consuming().map(|d| d.as_millis() as u64);
    write!(w, "{S4}Most time-consuming sample costs {} ms", u64_to_display(t))?;
    Ok(())
}

/// 导出任务最终结果.
pub struct ExportResult {
    /// 归档路径.
    pub archive: PathBuf,
    /// 运行统计.
    pub profile: Profile,
}

impl ExportResult {
    /// 打印运行结果.
    pub fn analyze(&self) -> io::Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        utils::sep_to(&mut out)?;
        writeln!(out, "Archive: {}", self.archive.display())?;
        describe_into(&self.profile, &mut out)?;
        writeln!(out)?;
        utils::sep_to(&mut out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_empty_profile() {
        let mut buf = Vec::new();
        describe_into(&Profile::new(0).finish(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("Profile:"));
        assert!(text.contains("Candidates: 0"));
        assert!(text.contains("Average extraction time: / ms"));
        assert!(text.ends_with("costs / ms"));
    }
}
