//! 加速器 SDK 动态库环境
//!
//! 进程级对象，通过 `Arc` 注入到各个执行上下文。已加载的库在最后一个
//! `Arc<SdkEnvironment>` 释放时卸载。

use crate::api::error::ContextError;
use crate::Result;
use libloading::Library;
use parking_lot::Mutex;
use std::fmt;
use std::path::{Path, PathBuf};

struct LoadedLibrary {
    path: PathBuf,
    _library: Library,
}

/// 已加载的 SDK 库集合
pub struct SdkEnvironment {
    libraries: Mutex<Vec<LoadedLibrary>>,
}

impl SdkEnvironment {
    /// 尚未加载任何库的环境
    pub fn new() -> Self {
        Self {
            libraries: Mutex::new(Vec::new()),
        }
    }

    /// 在 `paths` 下按 `candidates` 逐个尝试加载
    ///
    /// `paths` 为空时直接用候选名交给系统的库搜索路径。已经加载过的路径
    /// 不会重复加载，但计入结果。返回本次调用可用的库数量；
    /// 一个都没有时返回 `LibraryLoad`。
    pub fn load(&self, paths: &[PathBuf], candidates: &[&str]) -> Result<usize> {
        let attempts: Vec<PathBuf> = if paths.is_empty() {
            candidates.iter().map(PathBuf::from).collect()
        } else {
            paths
                .iter()
                .flat_map(|dir| candidates.iter().map(move |name| dir.join(name)))
                .collect()
        };

        let mut libraries = self.libraries.lock();
        let mut available = 0;
        let mut failures = Vec::new();

        for path in attempts {
            if libraries.iter().any(|lib| lib.path == path) {
                available += 1;
                continue;
            }

            // SAFETY: 只探测库是否可加载，此处不调用任何符号
            match unsafe { Library::new(&path) } {
                Ok(library) => {
                    tracing::info!("Loaded accelerator library: {}", path.display());
                    libraries.push(LoadedLibrary {
                        path,
                        _library: library,
                    });
                    available += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to load {}: {}", path.display(), e);
                    failures.push(path.display().to_string());
                }
            }
        }

        if available == 0 {
            return Err(ContextError::LibraryLoad(format!(
                "no accelerator library could be loaded (tried {})",
                if failures.is_empty() {
                    "nothing".to_string()
                } else {
                    failures.join(", ")
                }
            ))
            .into());
        }
        Ok(available)
    }

    /// 该路径是否已加载
    pub fn is_loaded(&self, path: &Path) -> bool {
        self.libraries.lock().iter().any(|lib| lib.path == path)
    }

    /// 已加载库的路径，按加载顺序
    pub fn loaded_paths(&self) -> Vec<PathBuf> {
        self.libraries
            .lock()
            .iter()
            .map(|lib| lib.path.clone())
            .collect()
    }

    /// 已加载的库数量
    pub fn len(&self) -> usize {
        self.libraries.lock().len()
    }

    /// 是否没有加载任何库
    pub fn is_empty(&self) -> bool {
        self.libraries.lock().is_empty()
    }
}

impl Default for SdkEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SdkEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdkEnvironment")
            .field("loaded", &self.loaded_paths())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_nothing_loadable() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("libfake.so"), b"not an elf").unwrap();

        let env = SdkEnvironment::new();
        let err = env
            .load(&[dir.path().to_path_buf()], &["libfake.so", "libabsent.so"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LibraryLoad);
        assert!(err.to_string().contains("libfake.so"));
        assert!(env.is_empty());
    }

    #[test]
    fn test_empty_candidates() {
        let env = SdkEnvironment::new();
        let err = env.load(&[], &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LibraryLoad);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_loads_system_library_once() {
        let dir = ["/lib/x86_64-linux-gnu", "/usr/lib/x86_64-linux-gnu", "/lib64", "/usr/lib64"]
            .iter()
            .map(PathBuf::from)
            .find(|dir| dir.join("libm.so.6").exists());
        let Some(dir) = dir else {
            return;
        };

        let env = SdkEnvironment::new();
        assert_eq!(env.load(&[dir.clone()], &["libm.so.6"]).unwrap(), 1);
        assert_eq!(env.load(&[dir.clone()], &["libm.so.6", "libabsent.so"]).unwrap(), 1);
        assert_eq!(env.len(), 1);
        assert!(env.is_loaded(&dir.join("libm.so.6")));
    }
}
