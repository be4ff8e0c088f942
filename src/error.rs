/*
============================================================================
エラー定義モジュール (error.rs)
============================================================================

【ファイル概要】
テーマ読み込みとフック管理で発生する失敗を型として定義し、
C ABI側に返すステータス値（HRESULT / INITRESULT）への変換を提供する。

【エラー分類】
- ThemeError：依存DLL欠如、テーマファイル不正、セクション作成失敗
- HookError：フック基盤初期化失敗、フック設置失敗、後始末の不整合

【設計原則】
OSが返したHRESULTは加工せずに保持し、そのまま呼び出し元へ伝える。
例外的な制御フローは使わず、全て戻り値で報告する。

============================================================================
*/

use thiserror::Error;

use crate::constants::{E_FAIL, S_OK};

/// テーマ読み込み処理の失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThemeError {
    /// 必要なDLLまたはエクスポートが見つからない
    #[error("required dependency is missing: {name}")]
    MissingDependency { name: String },

    /// GetThemeDefaults がテーマファイルを拒否した
    #[error("theme file was rejected by the OS parser (hr=0x{code:08X})")]
    InvalidThemeFile { code: i32 },

    /// LoaderLoadTheme がセクション作成に失敗した
    #[error("theme sections could not be created (hr=0x{code:08X})")]
    ThemeLoadFailed { code: i32 },
}

impl ThemeError {
    pub fn missing(name: impl Into<String>) -> Self {
        ThemeError::MissingDependency { name: name.into() }
    }

    /// C ABIへ返すHRESULT
    ///
    /// OS由来の失敗はOSのコードをそのまま返す。
    pub fn hresult(&self) -> i32 {
        match self {
            ThemeError::MissingDependency { .. } => E_FAIL,
            ThemeError::InvalidThemeFile { code } | ThemeError::ThemeLoadFailed { code } => *code,
        }
    }
}

/// `Result<(), ThemeError>` を HRESULT に畳み込む
pub fn theme_result_to_hresult(result: &Result<(), ThemeError>) -> i32 {
    match result {
        Ok(()) => S_OK,
        Err(e) => e.hresult(),
    }
}

/// フック管理処理の失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    #[error("interception subsystem could not be initialized: {reason}")]
    SubsystemInit { reason: String },

    #[error("failed to install hook on {name}: {reason}")]
    Install { name: String, reason: String },

    /// 後始末後もフックが一部有効なままの可能性がある
    #[error("hooks may still be partially active: {reason}")]
    PartialTeardown { reason: String },
}

/// InitializeHooks の戻り値（C ABI互換）
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitResult {
    Succeeded = 0,
    Failed = 1,
    FailedSubsystemInit = 2,
    FailedHookInstall = 3,
}

impl From<&HookError> for InitResult {
    fn from(error: &HookError) -> Self {
        match error {
            HookError::SubsystemInit { .. } => InitResult::FailedSubsystemInit,
            HookError::Install { .. } => InitResult::FailedHookInstall,
            HookError::PartialTeardown { .. } => InitResult::Failed,
        }
    }
}

impl From<&Result<(), HookError>> for InitResult {
    fn from(result: &Result<(), HookError>) -> Self {
        match result {
            Ok(()) => InitResult::Succeeded,
            Err(e) => e.into(),
        }
    }
}

/// Uninitialize の戻り値（C ABI互換）
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UninitResult {
    Succeeded = 0,
    Failed = 1,
}

impl From<&Result<(), HookError>> for UninitResult {
    fn from(result: &Result<(), HookError>) -> Self {
        match result {
            Ok(()) => UninitResult::Succeeded,
            Err(_) => UninitResult::Failed,
        }
    }
}
