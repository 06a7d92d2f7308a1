// Platform backends. Only Win32 is implemented; the overlay core itself is
// platform-neutral and talks to it through the surface/enumerator traits.

pub mod win32;

pub use win32::{Win32DisplayEnumerator, Win32SurfaceFactory};
