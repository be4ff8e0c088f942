/*
============================================================================
APIフック管理モジュール (hook.rs)
============================================================================

【ファイル概要】
関数フック基盤（MinHook相当：Initialize / CreateHook / Uninitialize）を
トレイト `HookBackend` として抽象化し、その上でフックの設置と解除を
一つのインターフェースで提供する。

【主要機能】
1. initialize_hooks：基盤初期化 → 対象関数の特定 → リダイレクト設置
2. uninitialize：全リダイレクト解除 → 基盤終了
3. trampoline：設置済みフックの元関数呼び出し口を名前で取得

【状態フロー図】
未初期化 → initialize_hooks() → フック有効（プロセス全体に即時反映）
                                      ↓
                                uninitialize()
                                      ↓
                                   未初期化

【エラーハンドリング】
- 基盤初期化失敗：HookError::SubsystemInit（何も設置されない）
- 対象未検出・設置失敗：HookError::Install（基盤も終了させ、フックを残さない）
- 解除失敗：HookError::PartialTeardown（フックが一部残っている可能性あり）
  記録済みのフックと基盤の初期化状態はそのまま残り、uninitialize() で再試行できる。
  その間の initialize_hooks() は SubsystemInit で拒否する

============================================================================
*/

#[cfg(windows)]
pub mod detour;
#[cfg(windows)]
pub mod open_theme_data;

use std::ffi::c_void;

use crate::error::HookError;

/// 関数フック基盤
pub trait HookBackend: Send {
    /// 基盤を初期化する。初期化済みならエラー。
    fn initialize(&mut self) -> Result<(), HookError>;

    /// `target` を `replacement` へリダイレクトし、元関数へのトランポリンを返す。
    /// 成功時点でリダイレクトは有効。
    ///
    /// # Safety
    /// `target` と `replacement` は同じシグネチャの関数を指していること。
    unsafe fn create_hook(
        &mut self,
        target: *const c_void,
        replacement: *const c_void,
    ) -> Result<*const c_void, String>;

    /// 全リダイレクトを解除して基盤を終了する
    fn uninitialize(&mut self) -> Result<(), HookError>;
}

/// フック対象の定義
#[derive(Debug, Clone, Copy)]
pub struct HookTarget {
    pub name: &'static str,
    /// 対象関数のアドレスを探す（見つからなければ None）
    pub locate: fn() -> Option<*const c_void>,
    pub replacement: *const c_void,
}

/// 【HookDescriptor】設置済みフック一件分の情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookDescriptor {
    pub name: &'static str,
    pub target: usize,
    pub replacement: usize,
    pub trampoline: usize,
}

/// 【InterceptionEngine】フックの設置・解除を管理する
pub struct InterceptionEngine<B: HookBackend> {
    backend: B,
    hooks: Vec<HookDescriptor>,
}

impl<B: HookBackend> InterceptionEngine<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            hooks: Vec::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn hooks(&self) -> &[HookDescriptor] {
        &self.hooks
    }

    /// 名前で元関数へのトランポリンを取得する
    pub fn trampoline(&self, name: &str) -> Option<*const c_void> {
        self.hooks
            .iter()
            .find(|hook| hook.name == name)
            .map(|hook| hook.trampoline as *const c_void)
    }

    /// 基盤を初期化し `target` にフックを設置する
    pub fn initialize_hooks(&mut self, target: &HookTarget) -> Result<(), HookError> {
        if !self.hooks.is_empty() {
            let e = HookError::SubsystemInit {
                reason: format!("{} hook(s) from a previous initialize are still installed", self.hooks.len()),
            };
            tracing::error!("{e}");
            return Err(e);
        }

        self.backend.initialize().inspect_err(|e| {
            tracing::error!("{e}");
        })?;

        let installed = match (target.locate)() {
            Some(address) => unsafe { self.backend.create_hook(address, target.replacement) }
                .map(|trampoline| (address, trampoline)),
            None => Err("target function could not be located".to_owned()),
        };

        match installed {
            Ok((address, trampoline)) => {
                tracing::info!("hooked {} at {:p}", target.name, address);
                self.hooks.push(HookDescriptor {
                    name: target.name,
                    target: address as usize,
                    replacement: target.replacement as usize,
                    trampoline: trampoline as usize,
                });
                Ok(())
            }
            Err(reason) => {
                tracing::error!("failed to hook {}: {reason}", target.name);
                if let Err(e) = self.backend.uninitialize() {
                    tracing::warn!("cleanup after failed install: {e}");
                }
                Err(HookError::Install {
                    name: target.name.to_owned(),
                    reason,
                })
            }
        }
    }

    /// 全フックを解除し基盤を終了する
    pub fn uninitialize(&mut self) -> Result<(), HookError> {
        let result = self.backend.uninitialize();
        match &result {
            Ok(()) => {
                tracing::info!("removed {} hook(s)", self.hooks.len());
                self.hooks.clear();
            }
            Err(e) => tracing::error!("{e}"),
        }
        result
    }
}
