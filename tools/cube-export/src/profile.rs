//! 导出运行统计.

use std::time::{Duration, Instant};

use luna_cube::dataset::Sample;
use luna_cube::CubeShape;

/// 累加计时器.
///
/// 该计时器支持 "中途中断" 与 "结束中断, 继续开始计时".
#[derive(Clone, Debug)]
struct AccTimer {
    consumed: Duration,
    since: Instant,
}

impl AccTimer {
    /// 初始化计时器. 初始化时会视为已经开始计时 (`self.start()`).
    #[inline]
    pub fn new() -> Self {
        Self {
            consumed: Duration::from_secs(0),
            since: Instant::now(),
        }
    }

    /// 结束计时, 并将这一区间的时间累加. 返回本轮计时时长.
    #[inline]
    pub fn elapsed(&mut self) -> Duration {
        let d = self.since.elapsed();
        self.consumed += d;
        d
    }

    /// 获得总共累计下来的时间综合 (以毫秒为单位).
    #[inline]
    pub fn get_total_ms(&self) -> u64 {
        self.consumed.as_millis() as u64
    }
}

impl Default for AccTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// 导出任务数据统计.
#[derive(Clone, Debug)]
pub struct Profile {
    /// 数据集中的样本个数.
    candidates: u64,

    /// 成功提取的样本个数.
    extracted: u64,

    /// 提取失败的样本个数.
    failed: u64,

    /// 成功提取, 但形状小于请求形状的样本个数.
    truncated: u64,

    /// 成功提取的结节样本个数.
    positives: u64,

    /// 所有样本提取耗时之和 (各线程累加, 包括读取 CT 文件的 IO 时间).
    sample_time: Duration,

    /// 最耗时的一次提取.
    most: Option<Duration>,

    /// 整个任务花费的总时间.
    real_time: AccTimer,
}

impl Profile {
    /// 初始化. 同时开始总计时.
    #[inline]
    pub fn new(candidates: usize) -> Self {
        Self {
            candidates: candidates as u64,
            extracted: 0,
            failed: 0,
            truncated: 0,
            positives: 0,
            sample_time: Duration::ZERO,
            most: None,
            real_time: AccTimer::default(),
        }
    }

    /// 记录一次提取结果及其耗时.
    pub fn count<E>(&mut self, result: &Result<Sample, E>, shape: &CubeShape, took: Duration) {
        self.sample_time += took;
        self.most = Some(self.most.map_or(took, |m| m.max(took)));
        match result {
            Ok(sample) => {
                self.extracted += 1;
                if !sample.is_full(shape) {
                    self.truncated += 1;
                }
                if sample.label == 1 {
                    self.positives += 1;
                }
            }
            Err(_) => self.failed += 1,
        }
    }

    /// 结束全部计时.
    #[inline]
    pub fn finish(mut self) -> Self {
        self.real_time.elapsed();
        self
    }

    /// 数据集样本个数.
    #[inline]
    pub fn get_candidates(&self) -> u64 {
        self.candidates
    }

    /// 成功提取的样本个数.
    #[inline]
    pub fn get_extracted(&self) -> u64 {
        self.extracted
    }

    /// 提取失败的样本个数.
    #[inline]
    pub fn get_failed(&self) -> u64 {
        self.failed
    }

    /// 被边界截断的样本个数.
    #[inline]
    pub fn get_truncated(&self) -> u64 {
        self.truncated
    }

    /// 结节样本个数.
    #[inline]
    pub fn get_positives(&self) -> u64 {
        self.positives
    }

    /// 以毫秒为单位获得所有样本提取耗时之和.
    #[inline]
    pub fn get_sample_time_ms(&self) -> u64 {
        self.sample_time.as_millis() as u64
    }

    /// 以毫秒为单位获得任务总自然时间.
    #[inline]
    pub fn get_real_time_ms(&self) -> u64 {
        self.real_time.get_total_ms()
    }

    /// 以毫秒为单位获得单个样本的平均提取时间.
    pub fn get_avg_sample_time_ms(&self) -> Option<f64> {
        match self.extracted + self.failed {
            0 => None,
            n => Some(self.sample_time.as_secs_f64() * 1000.0 / n as f64),
        }
    }

    /// 获取最耗时的一次提取所消耗的时间. 如果不存在任务, 则返回 `None`.
    #[inline]
    pub fn get_most_time_consuming(&self) -> Option<Duration> {
        self.most
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    fn sample(dim: (usize, usize, usize, usize), label: u8) -> Result<Sample, ()> {
        Ok(Sample {
            cube: Array4::zeros(dim),
            label,
        })
    }

    #[test]
    fn test_profile_counts() {
        let shape = CubeShape::new(2, 4, 4);
        let mut p = Profile::new(4);
        assert_eq!(p.get_avg_sample_time_ms(), None);
        assert_eq!(p.get_most_time_consuming(), None);

        p.count(&sample((1, 2, 4, 4), 1), &shape, Duration::from_millis(10));
        p.count(&sample((1, 1, 4, 4), 0), &shape, Duration::from_millis(30));
        p.count(&Err(()), &shape, Duration::from_millis(2));
        let p = p.finish();

        assert_eq!(p.get_candidates(), 4);
        assert_eq!(p.get_extracted(), 2);
        assert_eq!(p.get_failed(), 1);
        assert_eq!(p.get_truncated(), 1);
        assert_eq!(p.get_positives(), 1);
        assert_eq!(p.get_sample_time_ms(), 42);
        assert_eq!(p.get_most_time_consuming(), Some(Duration::from_millis(30)));
        assert!((p.get_avg_sample_time_ms().unwrap() - 14.0).abs() < 1e-9);
    }
}
