use std::path::{Path, PathBuf};

use anyhow::Result;
use boardkit_installer::{default_user_prefix, is_interactive, PrefixLayout};
use clap::ValueEnum;

use crate::render::{current_output_style, OutputStyle};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Per-invocation settings derived from global flags and the environment.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) layout: PrefixLayout,
    pub(crate) index_root: PathBuf,
    pub(crate) format: OutputFormat,
    pub(crate) style: OutputStyle,
    pub(crate) interactive: bool,
}

impl Settings {
    pub(crate) fn resolve(
        prefix: Option<&Path>,
        index_root: Option<&Path>,
        format: OutputFormat,
    ) -> Result<Self> {
        let prefix = match prefix {
            Some(prefix) => prefix.to_path_buf(),
            None => default_user_prefix()?,
        };
        Ok(Self::from_parts(
            PrefixLayout::new(prefix),
            index_root,
            format,
            current_output_style(),
            is_interactive(),
        ))
    }

    pub(crate) fn from_parts(
        layout: PrefixLayout,
        index_root: Option<&Path>,
        format: OutputFormat,
        style: OutputStyle,
        interactive: bool,
    ) -> Self {
        let index_root = index_root
            .map(Path::to_path_buf)
            .unwrap_or_else(|| layout.default_index_dir());
        let style = match format {
            OutputFormat::Json => OutputStyle::Plain,
            OutputFormat::Text => style,
        };
        Self {
            layout,
            index_root,
            format,
            style,
            interactive,
        }
    }
}
