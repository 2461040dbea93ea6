//! # Ontoforge CLI Library
//!
//! データセットから OWL オントロジーを生成するコマンドラインインターフェース
//! Generate, inspect and knowledge-base commands

pub mod commands;

pub use commands::*;
