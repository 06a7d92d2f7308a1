// Registry-based autostart for Windows
// Uses HKCU\Software\Microsoft\Windows\CurrentVersion\Run

use thiserror::Error;
use tracing::warn;
use windows::core::PCWSTR;
use windows::Win32::System::Registry::{
    RegCloseKey, RegDeleteValueW, RegOpenKeyExW, RegQueryValueExW, RegSetValueExW, HKEY,
    HKEY_CURRENT_USER, KEY_READ, KEY_WRITE, REG_SAM_FLAGS, REG_SZ,
};

const RUN_KEY: &str = "Software\\Microsoft\\Windows\\CurrentVersion\\Run";
const VALUE_NAME: &str = "ScreenShade";

#[derive(Debug, Error)]
pub enum AutostartError {
    #[error("could not open HKCU run key")]
    OpenKey,
    #[error("registry value update failed")]
    SetValue,
    #[error("registry value removal failed")]
    DeleteValue,
}

fn wide_string(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn open_run_key(access: u32) -> Result<HKEY, AutostartError> {
    let key_path = wide_string(RUN_KEY);
    let mut hkey = HKEY::default();
    unsafe {
        RegOpenKeyExW(
            HKEY_CURRENT_USER,
            PCWSTR(key_path.as_ptr()),
            Some(0),
            REG_SAM_FLAGS(access),
            &mut hkey,
        )
        .ok()
        .map_err(|_| AutostartError::OpenKey)?;
    }
    Ok(hkey)
}

/// Enable autostart by setting registry value to current executable path
pub fn enable() -> Result<(), AutostartError> {
    let hkey = open_run_key(KEY_WRITE.0)?;
    let exe_path = std::env::current_exe().unwrap_or_default();
    let exe_str = format!("\"{}\"", exe_path.display());
    let value_name = wide_string(VALUE_NAME);
    let data = wide_string(&exe_str);
    let data_bytes =
        unsafe { std::slice::from_raw_parts(data.as_ptr() as *const u8, data.len() * 2) };

    unsafe {
        let result = RegSetValueExW(
            hkey,
            PCWSTR(value_name.as_ptr()),
            Some(0),
            REG_SZ,
            Some(data_bytes),
        );
        let _ = RegCloseKey(hkey);
        result.ok().map_err(|_| AutostartError::SetValue)
    }
}

/// Disable autostart by removing the registry value
pub fn disable() -> Result<(), AutostartError> {
    let hkey = open_run_key(KEY_WRITE.0)?;
    let value_name = wide_string(VALUE_NAME);
    unsafe {
        let result = RegDeleteValueW(hkey, PCWSTR(value_name.as_ptr()));
        let _ = RegCloseKey(hkey);
        result.ok().map_err(|_| AutostartError::DeleteValue)
    }
}

/// Check if autostart is currently enabled
pub fn is_enabled() -> bool {
    match open_run_key(KEY_READ.0) {
        Ok(hkey) => {
            let value_name = wide_string(VALUE_NAME);
            unsafe {
                let result =
                    RegQueryValueExW(hkey, PCWSTR(value_name.as_ptr()), None, None, None, None);
                let _ = RegCloseKey(hkey);
                result.is_ok()
            }
        }
        Err(_) => false,
    }
}

/// Bring the registry entry in line with the persisted setting. Best-effort;
/// a registry failure is logged and does not block startup.
pub fn sync(launch_on_startup: bool) {
    let result = if launch_on_startup {
        enable()
    } else if is_enabled() {
        disable()
    } else {
        Ok(())
    };
    if let Err(err) = result {
        warn!(error = %err, "autostart sync failed");
    }
}
