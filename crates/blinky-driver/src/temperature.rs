//! 热敏电阻读数换算

use blinky_protocol::ThermistorValues;
use serde::{Deserialize, Serialize};

/// 原始读数到摄氏度的换算方式
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TemperatureCalculation {
    /// 直接发布原始 ADC 计数
    Raw,
    /// `celsius = raw * scale + offset`
    Linear { scale: f64, offset: f64 },
}

impl TemperatureCalculation {
    /// 12 位 ADC、3.3 V 参考、10 mV/°C 传感器
    pub const DEFAULT_SCALE: f64 = 3300.0 / 4096.0 / 10.0;

    pub fn convert(&self, raw: u16) -> f64 {
        match self {
            Self::Raw => f64::from(raw),
            Self::Linear { scale, offset } => f64::from(raw) * scale + offset,
        }
    }

    pub fn apply(&self, raw: ThermistorValues) -> Temperatures {
        Temperatures {
            celsius: raw.raw.map(|value| self.convert(value)),
            raw,
        }
    }
}

impl Default for TemperatureCalculation {
    fn default() -> Self {
        Self::Linear {
            scale: Self::DEFAULT_SCALE,
            offset: 0.0,
        }
    }
}

/// 一次热敏电阻读数（A、B、C、D）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperatures {
    pub celsius: [f64; 4],
    pub raw: ThermistorValues,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_mode() {
        let temps = TemperatureCalculation::Raw.apply(ThermistorValues {
            raw: [0, 1, 300, u16::MAX],
        });
        assert_eq!(temps.celsius, [0.0, 1.0, 300.0, 65535.0]);
    }

    #[test]
    fn test_linear_mode() {
        let calc = TemperatureCalculation::Linear {
            scale: 0.5,
            offset: -10.0,
        };
        assert_eq!(calc.convert(100), 40.0);
        assert_eq!(calc.convert(0), -10.0);
    }

    #[test]
    fn test_default_scale() {
        // 310 counts ≈ 250 mV ≈ 25 °C
        let celsius = TemperatureCalculation::default().convert(310);
        assert!((celsius - 24.97).abs() < 0.01, "{}", celsius);
    }

    #[test]
    fn test_deserialize_tagged() {
        #[derive(Deserialize)]
        struct Wrapper {
            temperature: TemperatureCalculation,
        }

        let w: Wrapper = toml::from_str("temperature = { mode = \"raw\" }").unwrap();
        assert_eq!(w.temperature, TemperatureCalculation::Raw);

        let w: Wrapper =
            toml::from_str("[temperature]\nmode = \"linear\"\nscale = 0.25\noffset = 1.5\n")
                .unwrap();
        assert_eq!(
            w.temperature,
            TemperatureCalculation::Linear {
                scale: 0.25,
                offset: 1.5
            }
        );
    }
}
