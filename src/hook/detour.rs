/*
============================================================================
retourによるフック基盤モジュール (hook/detour.rs)
============================================================================

【ファイル概要】
`HookBackend` を retour::RawDetour で実装する。
CreateHook の時点でリダイレクトを有効化し、Uninitialize で全て無効化する。

【リソース管理】
無効化に失敗したデトアーは保持したまま基盤を初期化済みとして残す。
この場合は PartialTeardown を返し、再初期化は拒否される。
Uninitialize を再度呼べば残ったデトアーだけを解除し直す。

============================================================================
*/

use std::ffi::c_void;

use retour::RawDetour;

use crate::{error::HookError, hook::HookBackend};

#[derive(Default)]
pub struct DetourBackend {
    initialized: bool,
    detours: Vec<RawDetour>,
}

// RawDetour はコード書き換え情報のみを保持し、Mutex 配下でのみ操作する
unsafe impl Send for DetourBackend {}

impl DetourBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

impl HookBackend for DetourBackend {
    fn initialize(&mut self) -> Result<(), HookError> {
        if self.initialized {
            return Err(HookError::SubsystemInit {
                reason: if self.detours.is_empty() {
                    "already initialized".to_owned()
                } else {
                    format!("{} detour(s) from a failed teardown are still active", self.detours.len())
                },
            });
        }
        self.initialized = true;
        Ok(())
    }

    unsafe fn create_hook(
        &mut self,
        target: *const c_void,
        replacement: *const c_void,
    ) -> Result<*const c_void, String> {
        if !self.initialized {
            return Err("interception subsystem is not initialized".to_owned());
        }

        let detour = unsafe { RawDetour::new(target as *const (), replacement as *const ()) }
            .map_err(|e| e.to_string())?;
        unsafe { detour.enable() }.map_err(|e| e.to_string())?;

        let trampoline = detour.trampoline() as *const () as *const c_void;
        self.detours.push(detour);
        Ok(trampoline)
    }

    fn uninitialize(&mut self) -> Result<(), HookError> {
        if !self.initialized {
            return Err(HookError::PartialTeardown {
                reason: "interception subsystem is not initialized".to_owned(),
            });
        }

        // 無効化できたものだけを破棄し、失敗したものは次回の再試行用に残す
        let mut failures = Vec::new();
        self.detours.retain(|detour| match unsafe { detour.disable() } {
            Ok(()) => false,
            Err(e) => {
                failures.push(e.to_string());
                true
            }
        });

        if failures.is_empty() {
            self.initialized = false;
            Ok(())
        } else {
            Err(HookError::PartialTeardown {
                reason: failures.join("; "),
            })
        }
    }
}
