//! デバイスレジストリ
//!
//! 起動時に固定された既知デバイスの一覧から、向きで1台を引く。
//! 向きごとに高々1台（背面の広角と前面の1台）という前提を固定化している。

use crate::domain::{AppConfig, CameraDevice, CameraError, CameraResult, DeviceRegistryPort, Facing};

/// 固定デバイス一覧のレジストリ
pub struct StaticDeviceRegistry {
    devices: Vec<CameraDevice>,
}

impl StaticDeviceRegistry {
    pub fn new(devices: Vec<CameraDevice>) -> Self {
        Self { devices }
    }

    /// 設定のデバイス名から背面・前面の2台構成を組み立てる
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(vec![
            CameraDevice {
                id: "camera:back:0".to_string(),
                name: config.capture.back_device_name.clone(),
                facing: Facing::Back,
            },
            CameraDevice {
                id: "camera:front:0".to_string(),
                name: config.capture.front_device_name.clone(),
                facing: Facing::Front,
            },
        ])
    }
}

impl DeviceRegistryPort for StaticDeviceRegistry {
    fn enumerate(&self, facing: Facing) -> CameraResult<CameraDevice> {
        self.devices
            .iter()
            .find(|d| d.facing == facing)
            .cloned()
            .ok_or(CameraError::DeviceUnavailable { facing })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enumerate_by_facing() {
        let registry = StaticDeviceRegistry::from_config(&AppConfig::default());

        let back = registry.enumerate(Facing::Back).unwrap();
        assert_eq!(back.id, "camera:back:0");
        assert_eq!(back.name, "Back Wide Camera");

        let front = registry.enumerate(Facing::Front).unwrap();
        assert_eq!(front.facing, Facing::Front);
    }

    #[test]
    fn test_missing_facing_is_unavailable() {
        let registry = StaticDeviceRegistry::new(vec![CameraDevice {
            id: "camera:back:0".to_string(),
            name: "Back".to_string(),
            facing: Facing::Back,
        }]);

        let result = registry.enumerate(Facing::Front);
        assert!(matches!(
            result,
            Err(CameraError::DeviceUnavailable {
                facing: Facing::Front
            })
        ));
    }
}
