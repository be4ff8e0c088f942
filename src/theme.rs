/*
============================================================================
読み込み済みテーマモジュール (theme.rs)
============================================================================

【ファイル概要】
uxtheme.dll 内部が期待するテーマファイル構造体 `ThemeFile` と、
それを所有しOSリソースの解放まで責任を持つ `LoadedTheme` を定義する。

【メモリレイアウト】
ThemeFile は #[repr(C)] で以下の順に並ぶ（OS側がタグで構造を検証する）:
  header[7] = "thmfile"
  sharable_view / sharable_section
  non_sharable_view / non_sharable_section
  trailer[3] = "end"

【リソースライフサイクル】
map()：両セクションをマップ → タグ設定
drop()：マップ済みビューのみアンマップ → 両ハンドルを無条件にクローズ
ビューが null でもハンドルは有効な場合があるため、クローズは省略しない。

============================================================================
*/

use std::sync::Arc;

use crate::{
    constants::{THEME_FILE_HEADER, THEME_FILE_TRAILER},
    handles::{SectionHandle, SectionPair, SectionView},
    theme_api::ThemeApi,
};

/// OpenThemeDataFromFile に渡すテーマファイル構造体
#[repr(C)]
#[derive(Debug)]
pub struct ThemeFile {
    header: [u8; 7],
    sharable_view: SectionView,
    sharable_section: SectionHandle,
    non_sharable_view: SectionView,
    non_sharable_section: SectionHandle,
    trailer: [u8; 3],
}

impl ThemeFile {
    pub fn header(&self) -> &[u8; 7] {
        &self.header
    }

    pub fn trailer(&self) -> &[u8; 3] {
        &self.trailer
    }

    pub fn sharable(&self) -> (SectionHandle, SectionView) {
        (self.sharable_section, self.sharable_view)
    }

    pub fn non_sharable(&self) -> (SectionHandle, SectionView) {
        (self.non_sharable_section, self.non_sharable_view)
    }
}

/// 【LoadedTheme】一つのテーマのOSリソースを所有する
///
/// 解放は Drop で行う。Arc で共有されるため、最後の参照が落ちた時点で一度だけ解放される。
pub struct LoadedTheme<A: ThemeApi> {
    file: ThemeFile,
    api: Arc<A>,
}

impl<A: ThemeApi> LoadedTheme<A> {
    /// 両セクションをマップしてテーマオブジェクトを構築する
    pub fn map(api: Arc<A>, sections: SectionPair) -> Self {
        let sharable_view = api.map_section(sections.sharable);
        let non_sharable_view = api.map_section(sections.non_sharable);

        if sharable_view.is_null() || non_sharable_view.is_null() {
            tracing::warn!(
                "theme section mapping incomplete (sharable={:?}, non-sharable={:?})",
                sharable_view,
                non_sharable_view
            );
        }

        LoadedTheme {
            file: ThemeFile {
                header: THEME_FILE_HEADER,
                sharable_view,
                sharable_section: sections.sharable,
                non_sharable_view,
                non_sharable_section: sections.non_sharable,
                trailer: THEME_FILE_TRAILER,
            },
            api,
        }
    }

    pub fn file(&self) -> &ThemeFile {
        &self.file
    }
}

impl<A: ThemeApi> Drop for LoadedTheme<A> {
    fn drop(&mut self) {
        if !self.file.sharable_view.is_null() {
            self.api.unmap_view(self.file.sharable_view);
        }
        if !self.file.non_sharable_view.is_null() {
            self.api.unmap_view(self.file.non_sharable_view);
        }

        self.api.close_section(self.file.non_sharable_section);
        self.api.close_section(self.file.sharable_section);

        tracing::debug!(
            "released theme sections {:?} / {:?}",
            self.file.sharable_section,
            self.file.non_sharable_section
        );
    }
}
