use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::emulation::{
    ScreenOrientation, ScreenOrientationType, SetDeviceMetricsOverrideParams,
    SetTouchEmulationEnabledParams,
};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceProfile {
    pub name: &'static str,
    pub user_agent: Option<&'static str>,
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
    pub is_mobile: bool,
    pub has_touch: bool,
    pub is_landscape: bool,
}

pub const IPHONE_13: DeviceProfile = DeviceProfile {
    name: "iPhone 13",
    user_agent: Some(
        "Mozilla/5.0 (iPhone; CPU iPhone OS 15_0 like Mac OS X) \
         AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.0 Mobile/15E148 Safari/604.1",
    ),
    width: 390,
    height: 844,
    device_scale_factor: 3.0,
    is_mobile: true,
    has_touch: true,
    is_landscape: false,
};

impl DeviceProfile {
    /// Plain desktop viewport with the browser's own user agent.
    pub fn desktop(width: u32, height: u32) -> Self {
        DeviceProfile {
            name: "desktop",
            user_agent: None,
            width,
            height,
            device_scale_factor: 1.0,
            is_mobile: false,
            has_touch: false,
            is_landscape: false,
        }
    }

    fn orientation(&self) -> ScreenOrientation {
        if self.is_landscape {
            ScreenOrientation::new(ScreenOrientationType::LandscapePrimary, 90)
        } else {
            ScreenOrientation::new(ScreenOrientationType::PortraitPrimary, 0)
        }
    }

    /// Applies viewport, touch and user agent overrides to `page`.
    pub async fn apply(&self, page: &Page) -> Result<()> {
        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(self.width as i64)
            .height(self.height as i64)
            .device_scale_factor(self.device_scale_factor)
            .mobile(self.is_mobile)
            .screen_orientation(self.orientation())
            .build()
            .map_err(|e| AppError::RenderError(format!("Invalid device metrics for {}: {}", self.name, e)))?;
        page.execute(metrics).await?;

        if self.has_touch {
            let touch = SetTouchEmulationEnabledParams::builder()
                .enabled(true)
                .max_touch_points(5)
                .build()
                .map_err(|e| AppError::RenderError(format!("Invalid touch emulation for {}: {}", self.name, e)))?;
            page.execute(touch).await?;
        }

        if let Some(user_agent) = self.user_agent {
            page.execute(SetUserAgentOverrideParams::new(user_agent)).await?;
        }

        Ok(())
    }
}
