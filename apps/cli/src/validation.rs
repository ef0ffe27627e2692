//! 输入验证模块
//!
//! 解析命令行中的通道列表、亮度和时长。

use anyhow::{Context, Result};
use blinky_protocol::{NUM_CHANNELS, PERIOD_INCREMENT_US};

/// 解析通道列表
///
/// 支持逗号分隔的单个通道和闭区间，以及 `all`：
/// `1,2,5-8`、`all`。通道号从 1 开始，结果去重并排序。
pub fn parse_channels(input: &str) -> Result<Vec<usize>> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("all") {
        return Ok((1..=NUM_CHANNELS).collect());
    }

    let mut channels = Vec::new();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start: usize = start.trim().parse().with_context(|| format!("无效的通道: {}", part))?;
                let end: usize = end.trim().parse().with_context(|| format!("无效的通道: {}", part))?;
                if start > end {
                    anyhow::bail!("通道区间 {} 的起点大于终点", part);
                }
                channels.extend(start..=end);
            },
            None => {
                channels.push(part.parse().with_context(|| format!("无效的通道: {}", part))?);
            },
        }
    }

    if channels.is_empty() {
        anyhow::bail!("通道列表不能为空");
    }
    if let Some(bad) = channels.iter().find(|c| !(1..=NUM_CHANNELS).contains(*c)) {
        anyhow::bail!("通道 {} 超出范围 [1, {}]", bad, NUM_CHANNELS);
    }

    channels.sort_unstable();
    channels.dedup();
    Ok(channels)
}

/// 解析亮度（[0, 1]）
pub fn parse_intensity(value: &str) -> Result<f64, String> {
    let value: f64 = value.trim().parse().map_err(|e| format!("无效的亮度: {}", e))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("亮度 {} 超出范围 [0, 1]", value));
    }
    Ok(value)
}

/// 解析时长，返回微秒
///
/// 支持 `us`、`ms`、`s` 后缀（无后缀按毫秒）：`100us`、`250ms`、`1.5s`。
/// 结果必须是 `PERIOD_INCREMENT_US` 的整数倍。
pub fn parse_duration(value: &str) -> Result<u64, String> {
    let value = value.trim();
    let (number, scale) = if let Some(n) = value.strip_suffix("us") {
        (n, 1.0)
    } else if let Some(n) = value.strip_suffix("ms") {
        (n, 1_000.0)
    } else if let Some(n) = value.strip_suffix('s') {
        (n, 1_000_000.0)
    } else {
        (value, 1_000.0)
    };

    let number: f64 = number.trim().parse().map_err(|e| format!("无效的时长 {}: {}", value, e))?;
    if !number.is_finite() || number <= 0.0 {
        return Err(format!("时长必须为正数: {}", value));
    }

    let micros = number * scale;
    let rounded = micros.round();
    if (micros - rounded).abs() > 1e-6 || rounded as u64 % PERIOD_INCREMENT_US != 0 {
        return Err(format!(
            "时长 {} 必须是 {} us 的整数倍",
            value, PERIOD_INCREMENT_US
        ));
    }
    Ok(rounded as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_channels() {
        assert_eq!(parse_channels("1,2,5-7").unwrap(), vec![1, 2, 5, 6, 7]);
        assert_eq!(parse_channels(" 3 , 3, 1 ").unwrap(), vec![1, 3]);
        assert_eq!(parse_channels("all").unwrap().len(), NUM_CHANNELS);
    }

    #[test]
    fn test_parse_channels_invalid() {
        assert!(parse_channels("").is_err());
        assert!(parse_channels("0").is_err());
        assert!(parse_channels("65").is_err());
        assert!(parse_channels("8-2").is_err());
        assert!(parse_channels("a,b").is_err());
    }

    #[test]
    fn test_parse_intensity() {
        assert_eq!(parse_intensity("0.5"), Ok(0.5));
        assert_eq!(parse_intensity("1"), Ok(1.0));
        assert!(parse_intensity("1.01").is_err());
        assert!(parse_intensity("-0.1").is_err());
        assert!(parse_intensity("bright").is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("100us"), Ok(100));
        assert_eq!(parse_duration("250ms"), Ok(250_000));
        assert_eq!(parse_duration("1.5s"), Ok(1_500_000));
        assert_eq!(parse_duration("10"), Ok(10_000));
        assert_eq!(parse_duration("0.1"), Ok(100));
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert!(parse_duration("150us").is_err());
        assert!(parse_duration("0ms").is_err());
        assert!(parse_duration("-1s").is_err());
        assert!(parse_duration("soon").is_err());
    }
}
