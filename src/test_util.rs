#[cfg(test)]
pub(crate) fn with_temp_home<F, R>(func: F) -> R
where
    F: FnOnce(&std::path::Path) -> R,
{
    static HOME_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
    let _guard = HOME_MUTEX.lock().unwrap_or_else(|err| err.into_inner());
    let dir = tempfile::tempdir().expect("tempdir");
    let old_home = std::env::var("HOME").ok();
    let old_base = std::env::var("LLM_LINE_TRANSLATOR_DIR").ok();
    let old_key = std::env::var("OPENAI_API_KEY").ok();
    // SAFETY: every test touching these variables holds HOME_MUTEX.
    unsafe {
        std::env::set_var("HOME", dir.path());
        std::env::remove_var("LLM_LINE_TRANSLATOR_DIR");
        std::env::remove_var("OPENAI_API_KEY");
    }
    let result = func(dir.path());
    unsafe {
        restore("HOME", old_home);
        restore("LLM_LINE_TRANSLATOR_DIR", old_base);
        restore("OPENAI_API_KEY", old_key);
    }
    result
}

#[cfg(test)]
unsafe fn restore(key: &str, value: Option<String>) {
    match value {
        Some(value) => unsafe { std::env::set_var(key, value) },
        None => unsafe { std::env::remove_var(key) },
    }
}
