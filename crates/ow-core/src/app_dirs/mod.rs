use std::path::PathBuf;

/// Platform directories resolved for the running profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDirs {
    pub app_data_root: PathBuf,
    pub app_cache_root: PathBuf,
}

impl AppDirs {
    pub fn logs_dir(&self) -> PathBuf {
        self.app_cache_root.join("logs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logs_live_under_the_cache_root() {
        let dirs = AppDirs {
            app_data_root: PathBuf::from("/tmp/onionwallet"),
            app_cache_root: PathBuf::from("/tmp/cache/onionwallet"),
        };
        assert_eq!(dirs.logs_dir(), PathBuf::from("/tmp/cache/onionwallet/logs"));
    }
}
