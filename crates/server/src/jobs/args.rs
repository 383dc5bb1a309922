//! Argument vectors for the surgeon processor.
//!
//! Flag contract: `-d` dump metadata, `-v <level>` verbosity, `-r` remove
//! embedded fonts, `-m <from>=<to>` mapping (repeatable), `-c <list>` cleanup
//! keep-list, `-o <path>` output; the input path is always last.

use std::path::Path;

use pptx_surgeon_types::SurgeryOptions;

pub const DUMP_FLAG: &str = "-d";
pub const VERBOSE_FLAG: &str = "-v";
pub const VERBOSE_LEVEL: &str = "2";
pub const REMOVE_EMBED_FLAG: &str = "-r";
pub const MAPPING_FLAG: &str = "-m";
pub const CLEANUP_FLAG: &str = "-c";
pub const OUTPUT_FLAG: &str = "-o";

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// `-d <input>`
pub fn analyze_args(input: &Path) -> Vec<String> {
    vec![DUMP_FLAG.to_string(), path_arg(input)]
}

/// Verbosity, remove-embed, mappings (input order), cleanup, output, input.
/// Flags whose option is off or empty are omitted; incomplete mappings are
/// skipped.
pub fn surgery_args(options: &SurgeryOptions, output: &Path, input: &Path) -> Vec<String> {
    let mut args = Vec::new();

    if options.verbose {
        args.push(VERBOSE_FLAG.to_string());
        args.push(VERBOSE_LEVEL.to_string());
    }

    if options.remove_embed {
        args.push(REMOVE_EMBED_FLAG.to_string());
    }

    for mapping in options.font_mappings.iter().filter(|m| m.is_complete()) {
        args.push(MAPPING_FLAG.to_string());
        args.push(mapping.to_arg());
    }

    if !options.font_cleanup.is_empty() {
        args.push(CLEANUP_FLAG.to_string());
        args.push(options.font_cleanup.joined());
    }

    args.push(OUTPUT_FLAG.to_string());
    args.push(path_arg(output));
    args.push(path_arg(input));
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use pptx_surgeon_types::{FontCleanup, FontMapping};
    use pretty_assertions::assert_eq;

    fn s(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_analyze_args() {
        assert_eq!(
            analyze_args(Path::new("uploads/1-deck.pptx")),
            s(&["-d", "uploads/1-deck.pptx"])
        );
    }

    #[test]
    fn test_minimal_surgery_args() {
        let args = surgery_args(
            &SurgeryOptions::default(),
            Path::new("uploads/nice_deck.pptx"),
            Path::new("uploads/1-deck.pptx"),
        );
        assert_eq!(args, s(&["-o", "uploads/nice_deck.pptx", "uploads/1-deck.pptx"]));
    }

    #[test]
    fn test_full_surgery_args_order() {
        let options = SurgeryOptions {
            remove_embed: true,
            verbose: true,
            font_mappings: vec![
                FontMapping::new("Arial", "Calibri"),
                FontMapping::new("", "Ignored"),
                FontMapping::new("Gulim", "Noto Sans KR"),
            ],
            font_cleanup: FontCleanup::parse("Calibri,Noto Sans KR"),
        };
        let args = surgery_args(&options, Path::new("out.pptx"), Path::new("in.pptx"));
        assert_eq!(
            args,
            s(&[
                "-v",
                "2",
                "-r",
                "-m",
                "Arial=Calibri",
                "-m",
                "Gulim=Noto Sans KR",
                "-c",
                "Calibri,Noto Sans KR",
                "-o",
                "out.pptx",
                "in.pptx",
            ])
        );
    }

    #[test]
    fn test_single_mapping_appears_once() {
        let options = SurgeryOptions {
            font_mappings: vec![FontMapping::new("Arial", "Calibri")],
            ..SurgeryOptions::default()
        };
        let args = surgery_args(&options, Path::new("o"), Path::new("i"));
        let hits = args
            .windows(2)
            .filter(|w| w[0] == "-m" && w[1] == "Arial=Calibri")
            .count();
        assert_eq!(hits, 1);
        assert_eq!(args.iter().filter(|a| *a == "-m").count(), 1);
    }

    #[test]
    fn test_remove_embed_only() {
        let options = SurgeryOptions {
            remove_embed: true,
            ..SurgeryOptions::default()
        };
        let args = surgery_args(&options, Path::new("o"), Path::new("i"));
        assert_eq!(args, s(&["-r", "-o", "o", "i"]));
    }
}
