// Prevents console window in release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

#[cfg(windows)]
fn main() {
    app::run();
}

#[cfg(not(windows))]
fn main() {
    eprintln!("screenshade only runs on Windows");
    std::process::exit(1);
}

#[cfg(windows)]
mod app {
    use screenshade::config::{self, JsonSettingsStore, SettingsStore};
    use screenshade::display::HotplugEvent;
    use screenshade::overlay::{OverlayEvent, OverlayManager};
    use screenshade::platform::{Win32DisplayEnumerator, Win32SurfaceFactory};
    use screenshade::{autostart, logging, tray};
    use std::cell::RefCell;
    use std::sync::mpsc::{self, Receiver};
    use std::time::Instant;
    use tracing::debug;
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::System::Threading::{
        CreateMutexW, OpenMutexW, SYNCHRONIZATION_ACCESS_RIGHTS,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        CreateWindowExW, DefWindowProcW, DispatchMessageW, GetMessageW, KillTimer,
        PostQuitMessage, RegisterClassW, SetTimer, TranslateMessage, CW_USEDEFAULT, MSG,
        WINDOW_EX_STYLE, WM_COMMAND, WM_DISPLAYCHANGE, WM_LBUTTONUP, WM_RBUTTONUP, WM_TIMER,
        WNDCLASSW, WS_OVERLAPPED,
    };

    const SINGLE_INSTANCE_MUTEX: &str = "ScreenShadeMutex\0";
    const APP_CLASS_NAME: &str = "ScreenShadeApp\0";

    const PUMP_TIMER_ID: usize = 1;
    /// Debounce pump interval; a third of the render quiet window.
    const PUMP_INTERVAL_MS: u32 = 50;

    struct App {
        manager: OverlayManager,
        events: Receiver<OverlayEvent>,
        store: JsonSettingsStore,
        hwnd: HWND,
        /// Last icon state pushed to the tray, to avoid redundant updates.
        tray_dimming: bool,
    }

    thread_local! {
        static APP: RefCell<Option<App>> = const { RefCell::new(None) };
    }

    fn with_app(f: impl FnOnce(&mut App)) {
        APP.with(|cell| {
            if let Some(app) = cell.borrow_mut().as_mut() {
                f(app);
            }
        });
    }

    /// Drain surface/window events into the manager and re-derive the tray
    /// icon state. Handling one event can emit more (a rebuild after the
    /// last close), so loop until the channel is empty.
    fn drain_events(app: &mut App) {
        while let Ok(event) = app.events.try_recv() {
            app.manager.handle_event(event);
        }
        let dimming = app.manager.is_visible();
        if dimming != app.tray_dimming {
            app.tray_dimming = dimming;
            tray::set_dimming_state(app.hwnd, dimming);
        }
    }

    pub fn run() {
        logging::init();

        // Single-instance check
        if is_already_running() {
            debug!("another instance is running, exiting");
            return;
        }

        let store = JsonSettingsStore::new();
        let settings = config::load_and_prune(&store);
        autostart::sync(settings.launch_on_startup);

        let inspect = std::env::var("SCREENSHADE_INSPECT").is_ok();
        let (tx, rx) = mpsc::channel();

        let hwnd = create_app_window();

        let mut manager = OverlayManager::new(
            Box::new(Win32DisplayEnumerator),
            Box::new(Win32SurfaceFactory),
            Box::new(JsonSettingsStore::new()),
            tx,
            inspect,
        );
        manager.init();
        if !settings.is_enabled {
            // Globally disabled: zero overlay windows until re-enabled.
            manager.remove_all(false);
        }

        tray::add_tray_icon(hwnd, manager.is_visible());
        let tray_dimming = manager.is_visible();

        APP.with(|cell| {
            *cell.borrow_mut() = Some(App {
                manager,
                events: rx,
                store,
                hwnd,
                tray_dimming,
            });
        });
        with_app(drain_events);

        unsafe {
            SetTimer(Some(hwnd), PUMP_TIMER_ID, PUMP_INTERVAL_MS, None);

            let mut msg = MSG::default();
            while GetMessageW(&mut msg, None, 0, 0).as_bool() {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }

            let _ = KillTimer(Some(hwnd), PUMP_TIMER_ID);
        }

        tray::remove_tray_icon(hwnd);
    }

    fn create_app_window() -> HWND {
        unsafe {
            let hinstance = GetModuleHandleW(PCWSTR::null()).unwrap_or_default();
            let class_name: Vec<u16> = APP_CLASS_NAME.encode_utf16().collect();

            let wc = WNDCLASSW {
                lpfnWndProc: Some(app_window_proc),
                hInstance: hinstance.into(),
                lpszClassName: PCWSTR(class_name.as_ptr()),
                ..Default::default()
            };
            RegisterClassW(&wc);

            // Hidden top-level window: receives tray callbacks, menu
            // commands, the pump timer and WM_DISPLAYCHANGE broadcasts.
            CreateWindowExW(
                WINDOW_EX_STYLE(0),
                PCWSTR(class_name.as_ptr()),
                PCWSTR(class_name.as_ptr()),
                WS_OVERLAPPED,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                0,
                0,
                None,
                None,
                Some(hinstance.into()),
                None,
            )
            .unwrap_or_default()
        }
    }

    unsafe extern "system" fn app_window_proc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        match msg {
            tray::WM_TRAY_ICON => {
                let event = lparam.0 as u32;
                if event == WM_RBUTTONUP || event == WM_LBUTTONUP {
                    with_app(|app| {
                        let settings = app.store.load().unwrap_or_default();
                        tray::show_context_menu(
                            hwnd,
                            settings.is_enabled,
                            settings.launch_on_startup,
                            settings.auto_update,
                        );
                    });
                }
                LRESULT(0)
            }
            WM_COMMAND => {
                handle_command((wparam.0 & 0xffff) as u32);
                LRESULT(0)
            }
            WM_DISPLAYCHANGE => {
                debug!("WM_DISPLAYCHANGE");
                with_app(|app| {
                    app.manager.handle_hotplug(HotplugEvent::MetricsChanged);
                    drain_events(app);
                });
                LRESULT(0)
            }
            WM_TIMER => {
                with_app(|app| {
                    app.manager.pump(Instant::now());
                    drain_events(app);
                });
                LRESULT(0)
            }
            _ => DefWindowProcW(hwnd, msg, wparam, lparam),
        }
    }

    fn handle_command(command: u32) {
        match command {
            tray::IDM_TOGGLE_OVERLAYS => with_app(|app| {
                let mut settings = app.store.load().unwrap_or_default();
                settings.is_enabled = !settings.is_enabled;
                let _ = app.store.save(&settings);

                if settings.is_enabled {
                    // Empty set, so this rebuilds immediately.
                    app.manager.reset_all();
                } else {
                    app.manager.remove_all(false);
                }
                drain_events(app);
            }),
            tray::IDM_RESET_OVERLAYS => with_app(|app| {
                app.manager.reset_all();
                drain_events(app);
            }),
            tray::IDM_LAUNCH_ON_STARTUP => with_app(|app| {
                let mut settings = app.store.load().unwrap_or_default();
                settings.launch_on_startup = !settings.launch_on_startup;
                let _ = app.store.save(&settings);
                autostart::sync(settings.launch_on_startup);
            }),
            tray::IDM_AUTO_UPDATE => with_app(|app| {
                let mut settings = app.store.load().unwrap_or_default();
                settings.auto_update = !settings.auto_update;
                let _ = app.store.save(&settings);
            }),
            tray::IDM_QUIT => {
                with_app(|app| {
                    // Persist before the process is allowed to exit; window
                    // destruction is left to teardown.
                    app.manager.terminate();
                });
                unsafe { PostQuitMessage(0) };
            }
            _ => {}
        }
    }

    /// Check if another instance is already running
    fn is_already_running() -> bool {
        let name: Vec<u16> = SINGLE_INSTANCE_MUTEX.encode_utf16().collect();

        unsafe {
            // Try to open existing mutex
            let existing = OpenMutexW(
                SYNCHRONIZATION_ACCESS_RIGHTS(0x001F0001), // MUTEX_ALL_ACCESS
                false,
                PCWSTR(name.as_ptr()),
            );
            if existing.is_ok() {
                // Another instance exists
                return true;
            }

            // Create the mutex (this instance owns it)
            let _ = CreateMutexW(None, true, PCWSTR(name.as_ptr()));
            false
        }
    }
}
