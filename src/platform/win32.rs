// Win32 overlay surfaces: layered, click-through, topmost popup windows.
//
// Each surface is a WS_EX_LAYERED | WS_EX_TRANSPARENT window with
// SetLayeredWindowAttributes driving the overall alpha and a WM_PAINT fill
// brush driving the tint. The tint color rides in GWLP_USERDATA so the
// shared window proc stays stateless. Windows are created hidden at 1x1;
// the overlay core positions and shows them once configuration is restored.
//
// Display identity: the monitor device name (MONITORINFOEXW.szDevice), which
// is stable for the monitor's connected lifetime and survives re-enumeration,
// unlike HMONITOR values.

use crate::display::{Bounds, DisplayDescriptor, DisplayId};
use crate::overlay::surface::{
    OverlayError, OverlaySurface, RenderUpdate, SurfaceFactory, SurfaceOptions,
};
use crate::overlay::OverlayEvent;
use std::sync::mpsc::Sender;
use std::sync::Mutex;
use tracing::{debug, warn};
use windows::core::PCWSTR;
use windows::Win32::Foundation::{COLORREF, HWND, LPARAM, LRESULT, RECT, WPARAM};
use windows::Win32::Graphics::Gdi::{
    BeginPaint, CreateSolidBrush, DeleteObject, EndPaint, EnumDisplayMonitors, FillRect,
    GetMonitorInfoW, InvalidateRect, HDC, HMONITOR, MONITORINFO, MONITORINFOEXW, PAINTSTRUCT,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, GetWindowLongPtrW, RegisterClassW,
    SetLayeredWindowAttributes, SetWindowLongPtrW, SetWindowPos, ShowWindow, CS_HREDRAW,
    CS_VREDRAW, GWLP_USERDATA, HWND_NOTOPMOST, HWND_TOPMOST, LWA_ALPHA, SWP_NOACTIVATE,
    SWP_NOSENDCHANGING, SW_HIDE, SW_SHOWNOACTIVATE, WM_PAINT, WNDCLASSW, WS_DISABLED,
    WS_EX_LAYERED, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_EX_TRANSPARENT, WS_POPUP,
};

const CLASS_NAME: &str = "ScreenShadeOverlay\0";

static CLASS_REGISTERED: Mutex<bool> = Mutex::new(false);

fn wide_str(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

fn colorref(update: &RenderUpdate) -> COLORREF {
    let c = update.color;
    COLORREF((c.r as u32) | ((c.g as u32) << 8) | ((c.b as u32) << 16))
}

/// Shared proc for all overlay surfaces. Paints the tint color stored in
/// GWLP_USERDATA; everything else is default handling.
unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if msg == WM_PAINT {
        let mut ps = PAINTSTRUCT::default();
        let hdc = BeginPaint(hwnd, &mut ps);
        let color = COLORREF(GetWindowLongPtrW(hwnd, GWLP_USERDATA) as u32);
        let brush = CreateSolidBrush(color);
        FillRect(hdc, &ps.rcPaint, brush);
        let _ = DeleteObject(brush.into());
        let _ = EndPaint(hwnd, &ps);
        return LRESULT(0);
    }
    DefWindowProcW(hwnd, msg, wparam, lparam)
}

fn register_class() -> bool {
    let mut registered = CLASS_REGISTERED.lock().unwrap();
    if *registered {
        return true;
    }

    unsafe {
        let hinstance = GetModuleHandleW(PCWSTR::null()).unwrap_or_default();
        let class_name = wide_str(CLASS_NAME);

        let wc = WNDCLASSW {
            style: CS_HREDRAW | CS_VREDRAW,
            lpfnWndProc: Some(window_proc),
            hInstance: hinstance.into(),
            lpszClassName: PCWSTR(class_name.as_ptr()),
            hbrBackground: CreateSolidBrush(COLORREF(0)),
            ..Default::default()
        };

        if RegisterClassW(&wc) != 0 {
            *registered = true;
        }
        *registered
    }
}

/// Monitor enumeration via EnumDisplayMonitors, keyed by device name.
pub struct Win32DisplayEnumerator;

unsafe extern "system" fn monitor_enum_proc(
    hmonitor: HMONITOR,
    _hdc: HDC,
    _lprect: *mut RECT,
    lparam: LPARAM,
) -> windows::core::BOOL {
    let displays = &mut *(lparam.0 as *mut Vec<DisplayDescriptor>);

    let mut mi = MONITORINFOEXW {
        monitorInfo: MONITORINFO {
            cbSize: std::mem::size_of::<MONITORINFOEXW>() as u32,
            ..Default::default()
        },
        ..Default::default()
    };

    if GetMonitorInfoW(hmonitor, &mut mi.monitorInfo).as_bool() {
        let rect = mi.monitorInfo.rcMonitor;
        let device = String::from_utf16_lossy(&mi.szDevice)
            .trim_end_matches('\0')
            .to_string();
        displays.push(DisplayDescriptor {
            id: DisplayId(device),
            bounds: Bounds::new(
                rect.left,
                rect.top,
                rect.right - rect.left,
                rect.bottom - rect.top,
            ),
        });
    }

    windows::core::BOOL::from(true)
}

impl crate::display::DisplayEnumerator for Win32DisplayEnumerator {
    fn displays(&self) -> Vec<DisplayDescriptor> {
        let mut displays: Vec<DisplayDescriptor> = Vec::new();
        unsafe {
            let _ = EnumDisplayMonitors(
                None,
                None,
                Some(monitor_enum_proc),
                LPARAM(&mut displays as *mut _ as isize),
            );
        }
        debug!(count = displays.len(), "enumerated displays");
        displays
    }
}

pub struct Win32SurfaceFactory;

struct Win32Surface {
    hwnd: HWND,
    id: DisplayId,
    always_on_top: bool,
    events: Sender<OverlayEvent>,
    closed: bool,
}

impl OverlaySurface for Win32Surface {
    fn set_frame(&mut self, frame: Bounds) {
        let insert_after = if self.always_on_top {
            HWND_TOPMOST
        } else {
            HWND_NOTOPMOST
        };
        unsafe {
            let _ = SetWindowPos(
                self.hwnd,
                Some(insert_after),
                frame.x,
                frame.y,
                frame.width,
                frame.height,
                SWP_NOACTIVATE | SWP_NOSENDCHANGING,
            );
        }
    }

    fn push_update(&mut self, update: &RenderUpdate) {
        let alpha = (update.alpha.clamp(0.0, 1.0) * 255.0) as u8;
        unsafe {
            SetWindowLongPtrW(self.hwnd, GWLP_USERDATA, colorref(update).0 as isize);
            let _ = SetLayeredWindowAttributes(self.hwnd, COLORREF(0), alpha, LWA_ALPHA);
            let _ = InvalidateRect(Some(self.hwnd), None, true);
        }
    }

    fn show(&mut self) {
        unsafe {
            let _ = ShowWindow(self.hwnd, SW_SHOWNOACTIVATE);
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        unsafe {
            let _ = ShowWindow(self.hwnd, SW_HIDE);
            if let Err(err) = DestroyWindow(self.hwnd) {
                warn!(display = %self.id, error = %err, "DestroyWindow failed");
            }
        }
        // DestroyWindow is synchronous on the owning thread; completion is
        // still reported through the event channel so the manager sequences
        // resets uniformly.
        let _ = self.events.send(OverlayEvent::Closed(self.id.clone()));
    }
}

impl SurfaceFactory for Win32SurfaceFactory {
    fn create(
        &mut self,
        display: &DisplayDescriptor,
        options: SurfaceOptions,
        events: Sender<OverlayEvent>,
    ) -> Result<Box<dyn OverlaySurface>, OverlayError> {
        if !register_class() {
            return Err(OverlayError::SurfaceCreation {
                id: display.id.clone(),
                reason: "window class registration failed".to_string(),
            });
        }

        let class_name = wide_str(CLASS_NAME);
        let mut ex_style =
            WS_EX_LAYERED | WS_EX_TRANSPARENT | WS_EX_TOOLWINDOW | WS_EX_NOACTIVATE;
        if options.always_on_top {
            ex_style |= WS_EX_TOPMOST;
        }

        let hwnd = unsafe {
            let hinstance = GetModuleHandleW(PCWSTR::null()).unwrap_or_default();
            CreateWindowExW(
                ex_style,
                PCWSTR(class_name.as_ptr()),
                PCWSTR::null(),
                WS_POPUP | WS_DISABLED,
                0,
                0,
                1,
                1,
                None,
                None,
                Some(hinstance.into()),
                None,
            )
        }
        .map_err(|err| OverlayError::SurfaceCreation {
            id: display.id.clone(),
            reason: err.to_string(),
        })?;

        unsafe {
            // Fully transparent until the first configuration push.
            let _ = SetLayeredWindowAttributes(hwnd, COLORREF(0), 0, LWA_ALPHA);
        }

        // Native surfaces have no content load phase; ready immediately.
        let _ = events.send(OverlayEvent::ContentReady(display.id.clone()));

        Ok(Box::new(Win32Surface {
            hwnd,
            id: display.id.clone(),
            always_on_top: options.always_on_top,
            events,
            closed: false,
        }))
    }
}
