// System tray icon with context menu.
//
// The icon has two states driven by OverlayManager::is_visible(): the
// default icon while at least one overlay is dimming a display, and a
// translucent variant when nothing is dimmed. Icon state is purely derived;
// the tray never owns overlay state.

use tracing::debug;
use windows::core::PCWSTR;
use windows::Win32::Foundation::{HWND, POINT};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Shell::{
    Shell_NotifyIconW, NIF_ICON, NIF_MESSAGE, NIF_TIP, NIM_ADD, NIM_DELETE, NIM_MODIFY,
    NOTIFYICONDATAW,
};
use windows::Win32::UI::WindowsAndMessaging::{
    AppendMenuW, CreatePopupMenu, DestroyMenu, GetCursorPos, LoadIconW, SetForegroundWindow,
    TrackPopupMenu, HICON, IDI_APPLICATION, MF_CHECKED, MF_SEPARATOR, MF_STRING, MF_UNCHECKED,
    TPM_BOTTOMALIGN, TPM_LEFTALIGN,
};

/// Custom message ID for tray icon callbacks
pub const WM_TRAY_ICON: u32 = 0x0401; // WM_APP + 1

/// Menu item IDs
pub const IDM_TOGGLE_OVERLAYS: u32 = 1001;
pub const IDM_RESET_OVERLAYS: u32 = 1002;
pub const IDM_LAUNCH_ON_STARTUP: u32 = 1003;
pub const IDM_AUTO_UPDATE: u32 = 1004;
pub const IDM_QUIT: u32 = 1005;

/// Embedded icon resource ids: 1 = default (dimming), 2 = translucent.
const ICON_DEFAULT: usize = 1;
const ICON_TRANSLUCENT: usize = 2;

fn wide_str(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn load_icon(resource_id: usize) -> HICON {
    unsafe {
        let hinstance = GetModuleHandleW(PCWSTR::null()).unwrap_or_default();
        LoadIconW(Some(hinstance.into()), PCWSTR(resource_id as *const u16))
            .or_else(|_| LoadIconW(None, IDI_APPLICATION))
            .unwrap_or_default()
    }
}

fn icon_data(hwnd: HWND, dimming: bool) -> NOTIFYICONDATAW {
    let mut nid = NOTIFYICONDATAW {
        cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
        hWnd: hwnd,
        uID: 1,
        uFlags: NIF_ICON | NIF_MESSAGE | NIF_TIP,
        uCallbackMessage: WM_TRAY_ICON,
        hIcon: load_icon(if dimming { ICON_DEFAULT } else { ICON_TRANSLUCENT }),
        ..Default::default()
    };

    let tip = wide_str("ScreenShade");
    let len = tip.len().min(nid.szTip.len());
    nid.szTip[..len].copy_from_slice(&tip[..len]);
    nid
}

/// Add the system tray icon
pub fn add_tray_icon(hwnd: HWND, dimming: bool) -> bool {
    unsafe { Shell_NotifyIconW(NIM_ADD, &icon_data(hwnd, dimming)).as_bool() }
}

/// Swap the icon between the dimming and translucent variants.
pub fn set_dimming_state(hwnd: HWND, dimming: bool) {
    debug!(dimming, "tray icon state");
    unsafe {
        let _ = Shell_NotifyIconW(NIM_MODIFY, &icon_data(hwnd, dimming));
    }
}

/// Remove the system tray icon
pub fn remove_tray_icon(hwnd: HWND) {
    unsafe {
        let nid = NOTIFYICONDATAW {
            cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
            hWnd: hwnd,
            uID: 1,
            ..Default::default()
        };
        let _ = Shell_NotifyIconW(NIM_DELETE, &nid);
    }
}

/// Show the tray context menu. Selections arrive as WM_COMMAND.
pub fn show_context_menu(hwnd: HWND, enabled: bool, launch_on_startup: bool, auto_update: bool) {
    let checked = |on: bool| if on { MF_CHECKED } else { MF_UNCHECKED };

    unsafe {
        let Ok(menu) = CreatePopupMenu() else {
            return;
        };

        let toggle_text = wide_str("Enable Overlays");
        let reset_text = wide_str("Reset Overlays");
        let startup_text = wide_str("Launch on Startup");
        let update_text = wide_str("Check for Updates Automatically");
        let quit_text = wide_str("Quit");

        let _ = AppendMenuW(
            menu,
            MF_STRING | checked(enabled),
            IDM_TOGGLE_OVERLAYS as usize,
            PCWSTR(toggle_text.as_ptr()),
        );
        let _ = AppendMenuW(
            menu,
            MF_STRING,
            IDM_RESET_OVERLAYS as usize,
            PCWSTR(reset_text.as_ptr()),
        );
        let _ = AppendMenuW(menu, MF_SEPARATOR, 0, PCWSTR::null());
        let _ = AppendMenuW(
            menu,
            MF_STRING | checked(launch_on_startup),
            IDM_LAUNCH_ON_STARTUP as usize,
            PCWSTR(startup_text.as_ptr()),
        );
        let _ = AppendMenuW(
            menu,
            MF_STRING | checked(auto_update),
            IDM_AUTO_UPDATE as usize,
            PCWSTR(update_text.as_ptr()),
        );
        let _ = AppendMenuW(menu, MF_SEPARATOR, 0, PCWSTR::null());
        let _ = AppendMenuW(menu, MF_STRING, IDM_QUIT as usize, PCWSTR(quit_text.as_ptr()));

        let mut pt = POINT::default();
        let _ = GetCursorPos(&mut pt);

        // Required for TrackPopupMenu to work correctly with tray icons
        let _ = SetForegroundWindow(hwnd);

        let _ = TrackPopupMenu(
            menu,
            TPM_LEFTALIGN | TPM_BOTTOMALIGN,
            pt.x,
            pt.y,
            Some(0),
            hwnd,
            None,
        );

        let _ = DestroyMenu(menu);
    }
}
