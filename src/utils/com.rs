use windows::Win32::System::Com::{CoInitializeEx, CoUninitialize, COINIT_APARTMENTTHREADED};

use crate::error::Result;

/// Runs `f` inside a single-threaded COM apartment on the current thread.
///
/// If the thread already lives in an apartment of another kind the call
/// proceeds in that apartment and nothing is torn down afterwards.
pub(crate) fn with_apartment<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    let initialized = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) }.is_ok();
    let _apartment = scopeguard::guard(initialized, |initialized| {
        if initialized {
            unsafe { CoUninitialize() };
        }
    });
    f()
}
