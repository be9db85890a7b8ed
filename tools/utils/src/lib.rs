//! 工具程序依赖的通用组件.

use luna_cube::HuWindow;

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 向 `w` 写入一条简单分隔线.
#[inline]
pub fn sep_to<W: std::io::Write>(mut w: W) -> std::io::Result<()> {
    writeln!(&mut w, "{SEP}")
}

/// 获得可并行核心数.
pub fn cpus() -> usize {
    std::thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from)
}

/// 解析形如 `0,1,5` 或 `0-4,7` 的分片列表. 保持给定顺序, 去除重复项.
pub fn parse_subsets(s: &str) -> Result<Vec<u32>, String> {
    let mut out: Vec<u32> = Vec::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let bad = || format!("`{part}` is not a legal subset list item");
        let ids: Vec<u32> = match part.split_once('-') {
            Some((a, b)) => {
                let a: u32 = a.trim().parse().map_err(|_| bad())?;
                let b: u32 = b.trim().parse().map_err(|_| bad())?;
                if a > b {
                    return Err(bad());
                }
                (a..=b).collect()
            }
            None => vec![part.parse().map_err(|_| bad())?],
        };
        for id in ids {
            if !out.contains(&id) {
                out.push(id);
            }
        }
    }
    if out.is_empty() {
        return Err(format!("`{s}` contains no subset"));
    }
    Ok(out)
}

/// 创建结节立方体使用的归一化窗口: 下限 -600, 上限 -300.
#[inline]
pub fn nodule_window() -> HuWindow {
    HuWindow::nodule()
}
