//! Shannon 熵计算
//!
//! 对输入窗口建立 256 桶频率直方图，计算 `H = -Σ p·log2(p)`（单位：bit/byte）。
//! 结果位于 `[0, 8]`：常量序列为 0，均匀分布趋近 8。
//!
//! 只分析前 N 字节是成本控制策略，窗口大小来自配置而非算法本身。

/// 对整段输入计算熵。空输入返回 0。
pub fn entropy(bytes: &[u8]) -> f64 {
    let histogram = byte_histogram(bytes);
    entropy_from_histogram(&histogram, bytes.len())
}

/// 只对前 `window` 个字节计算熵。
pub fn entropy_with_window(bytes: &[u8], window: usize) -> f64 {
    entropy(&bytes[..bytes.len().min(window)])
}

/// 256 桶字节频率。
pub fn byte_histogram(bytes: &[u8]) -> [u64; 256] {
    let mut counts = [0u64; 256];
    for &b in bytes {
        counts[b as usize] += 1;
    }
    counts
}

fn entropy_from_histogram(histogram: &[u64; 256], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }

    let total = total as f64;
    let h: f64 = histogram
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum();

    // 单一取值时求和结果可能是 -0.0
    h.max(0.0)
}
