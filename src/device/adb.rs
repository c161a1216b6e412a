/// `adb`-backed device session.
///
/// One session owns one device connection. The connection is established on
/// first use and re-established on the next call after any command fails.
use std::process::Output;

use async_trait::async_trait;
use base64::Engine as _;
use tokio::process::Command;
use tokio::sync::Mutex;

use crate::config::DeviceConfig;
use crate::errors::{SeeDroidError, SeeDroidResult};
use crate::executor::input::{InputDelivery, Key};
use crate::executor::text_input::{escape_input_text, is_plain_ascii};
use crate::perception::traits::ScreenCapture;
use crate::perception::types::ScreenSize;

const DUMP_PATH: &str = "/sdcard/window_dump.xml";

pub struct AdbSession {
    adb: String,
    serial: String,
    connected: Mutex<bool>,
}

impl AdbSession {
    pub fn new(adb: impl Into<String>, serial: impl Into<String>) -> Self {
        Self {
            adb: adb.into(),
            serial: serial.into(),
            connected: Mutex::new(false),
        }
    }

    pub fn from_config(cfg: &DeviceConfig) -> Self {
        Self::new(cfg.adb_path.clone(), cfg.serial.clone())
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub async fn disconnect(&self) {
        *self.connected.lock().await = false;
        tracing::info!(serial = %self.serial, "device marked disconnected");
    }

    async fn ensure_connected(&self) -> SeeDroidResult<()> {
        let mut connected = self.connected.lock().await;
        if *connected {
            return Ok(());
        }

        // Network serials (emulators, Genymotion) need an explicit connect.
        if self.serial.contains(':') {
            let out = self.raw(&["connect", &self.serial]).await?;
            let text = String::from_utf8_lossy(&out.stdout);
            if text.contains("failed") || text.contains("cannot") {
                return Err(SeeDroidError::Device(format!(
                    "adb connect {}: {}",
                    self.serial,
                    text.trim()
                )));
            }
        }

        let out = self.raw(&["-s", &self.serial, "get-state"]).await?;
        let state = String::from_utf8_lossy(&out.stdout).trim().to_string();
        if state != "device" {
            return Err(SeeDroidError::Device(format!(
                "device {} not ready (state: {})",
                self.serial,
                if state.is_empty() { "unknown" } else { state.as_str() }
            )));
        }

        *connected = true;
        tracing::info!(serial = %self.serial, "device connected");
        Ok(())
    }

    async fn raw(&self, args: &[&str]) -> SeeDroidResult<Output> {
        Command::new(&self.adb)
            .args(args)
            .output()
            .await
            .map_err(|e| SeeDroidError::Device(format!("failed to run {}: {e}", self.adb)))
    }

    /// Run `adb -s <serial> <args…>` and return stdout.
    async fn run(&self, args: &[&str]) -> SeeDroidResult<Vec<u8>> {
        self.ensure_connected().await?;

        let mut full = vec!["-s", self.serial.as_str()];
        full.extend_from_slice(args);
        tracing::debug!(args = ?args, "adb");

        let out = match self.raw(&full).await {
            Ok(out) => out,
            Err(e) => {
                self.disconnect().await;
                return Err(e);
            }
        };
        if !out.status.success() {
            self.disconnect().await;
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(SeeDroidError::Device(format!(
                "adb {} exited with {}: {}",
                args.join(" "),
                out.status,
                stderr.trim()
            )));
        }
        Ok(out.stdout)
    }

    async fn shell(&self, args: &[&str]) -> SeeDroidResult<String> {
        let mut full = vec!["shell"];
        full.extend_from_slice(args);
        let stdout = self.run(&full).await?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

#[async_trait]
impl ScreenCapture for AdbSession {
    async fn screenshot(&self) -> SeeDroidResult<Vec<u8>> {
        let bytes = self
            .run(&["exec-out", "screencap", "-p"])
            .await
            .map_err(|e| SeeDroidError::Capture(format!("screenshot: {e}")))?;
        if bytes.is_empty() {
            return Err(SeeDroidError::Capture("screenshot was empty".into()));
        }
        Ok(bytes)
    }

    async fn ui_tree(&self) -> SeeDroidResult<String> {
        self.shell(&["uiautomator", "dump", DUMP_PATH])
            .await
            .map_err(|e| SeeDroidError::Capture(format!("uiautomator dump: {e}")))?;
        let bytes = self
            .run(&["exec-out", "cat", DUMP_PATH])
            .await
            .map_err(|e| SeeDroidError::Capture(format!("read dump: {e}")))?;
        let xml = String::from_utf8_lossy(&bytes).into_owned();
        if xml.trim().is_empty() {
            return Err(SeeDroidError::Capture("UI tree dump was empty".into()));
        }
        Ok(xml)
    }

    async fn screen_size(&self) -> SeeDroidResult<ScreenSize> {
        let out = self
            .shell(&["wm", "size"])
            .await
            .map_err(|e| SeeDroidError::Capture(format!("wm size: {e}")))?;
        parse_wm_size(&out)
            .ok_or_else(|| SeeDroidError::Capture(format!("unexpected wm size output: {}", out.trim())))
    }
}

#[async_trait]
impl InputDelivery for AdbSession {
    async fn tap(&self, x: i32, y: i32) -> SeeDroidResult<()> {
        self.shell(&["input", "tap", &x.to_string(), &y.to_string()])
            .await
            .map(drop)
    }

    async fn swipe(
        &self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        duration_ms: u64,
    ) -> SeeDroidResult<()> {
        self.shell(&[
            "input",
            "swipe",
            &x1.to_string(),
            &y1.to_string(),
            &x2.to_string(),
            &y2.to_string(),
            &duration_ms.to_string(),
        ])
        .await
        .map(drop)
    }

    async fn send_text(&self, text: &str) -> SeeDroidResult<()> {
        if text.is_empty() {
            return Ok(());
        }
        if is_plain_ascii(text) {
            let escaped = escape_input_text(text);
            return self.shell(&["input", "text", &escaped]).await.map(drop);
        }

        // Needs the ADBKeyBoard IME to be installed and selected.
        let encoded = base64::engine::general_purpose::STANDARD.encode(text.as_bytes());
        let out = self
            .shell(&["am", "broadcast", "-a", "ADB_INPUT_B64", "--es", "msg", &encoded])
            .await?;
        if !out.contains("result=") {
            tracing::warn!(output = %out.trim(), "IME broadcast not acknowledged");
        }
        Ok(())
    }

    async fn press_key(&self, key: Key) -> SeeDroidResult<()> {
        self.shell(&["input", "keyevent", key.keycode()])
            .await
            .map(drop)
    }

    async fn launch_app(&self, package: &str) -> SeeDroidResult<()> {
        let out = self
            .shell(&[
                "monkey",
                "-p",
                package,
                "-c",
                "android.intent.category.LAUNCHER",
                "1",
            ])
            .await?;
        if out.contains("No activities found") || out.contains("monkey aborted") {
            return Err(SeeDroidError::Device(format!("cannot launch {package}")));
        }
        tracing::info!(package = %package, "app launched");
        Ok(())
    }

    async fn stop_app(&self, package: &str) -> SeeDroidResult<()> {
        self.shell(&["am", "force-stop", package]).await?;
        tracing::info!(package = %package, "app stopped");
        Ok(())
    }
}

/// Parse `wm size` output; an override size wins over the physical size.
pub fn parse_wm_size(output: &str) -> Option<ScreenSize> {
    let parse_line = |prefix: &str| {
        output.lines().find_map(|line| {
            let rest = line.trim().strip_prefix(prefix)?;
            let (w, h) = rest.trim().split_once('x')?;
            Some(ScreenSize::new(w.trim().parse().ok()?, h.trim().parse().ok()?))
        })
    };
    parse_line("Override size:").or_else(|| parse_line("Physical size:"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wm_size_physical() {
        assert_eq!(
            parse_wm_size("Physical size: 1080x1920\n"),
            Some(ScreenSize::new(1080, 1920))
        );
    }

    #[test]
    fn wm_size_override_wins() {
        let out = "Physical size: 1440x3200\nOverride size: 1080x2400\n";
        assert_eq!(parse_wm_size(out), Some(ScreenSize::new(1080, 2400)));
    }

    #[test]
    fn wm_size_garbage() {
        assert_eq!(parse_wm_size("error: no devices/emulators found"), None);
    }

    #[tokio::test]
    async fn missing_adb_binary_is_a_device_error() {
        let session = AdbSession::new("/nonexistent/adb-binary", "emulator-5554");
        let err = session.tap(1, 1).await.unwrap_err();
        assert!(matches!(err, SeeDroidError::Device(_)));

        let err = session.screenshot().await.unwrap_err();
        assert!(matches!(err, SeeDroidError::Capture(_)));
    }
}
