//! Index queries: `find`, `locate`, `exists` and `unique`.

use std::collections::HashSet;

use resource_scanner::ResourcePattern;

use super::ScanOptions;
use crate::error::CliError;

pub fn find(options: &ScanOptions, pattern: &str, glob: bool) -> Result<(), CliError> {
    let matches = if glob {
        let compiled = glob::Pattern::new(pattern).map_err(|source| CliError::Glob {
            pattern: pattern.to_string(),
            source,
        })?;
        options.scanner()?.matching_glob(&compiled)
    } else {
        let compiled = ResourcePattern::new(pattern)?;
        options.scanner()?.matching(&compiled)
    };

    print_sorted(matches);
    Ok(())
}

pub fn locate(options: &ScanOptions, pattern: &str) -> Result<(), CliError> {
    let compiled = ResourcePattern::new(pattern)?;
    print_sorted(options.scanner()?.locations_matching(&compiled));
    Ok(())
}

pub fn exists(options: &ScanOptions, path: &str) -> Result<(), CliError> {
    println!("{}", options.scanner()?.exists(path));
    Ok(())
}

pub fn unique(options: &ScanOptions, path: &str) -> Result<(), CliError> {
    println!("{}", options.scanner()?.is_unique(path));
    Ok(())
}

fn print_sorted(values: HashSet<String>) {
    for value in sorted(values) {
        println!("{}", value);
    }
}

fn sorted(values: HashSet<String>) -> Vec<String> {
    let mut values: Vec<String> = values.into_iter().collect();
    values.sort();
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_orders_lexically() {
        let values: HashSet<String> = ["b/x.txt", "a/z.txt", "a/y.txt"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        assert_eq!(sorted(values), vec!["a/y.txt", "a/z.txt", "b/x.txt"]);
    }

    #[test]
    fn test_invalid_regex_is_reported_before_scanning() {
        let options = ScanOptions::default();
        let result = locate(&options, "(unclosed");
        assert!(matches!(result, Err(CliError::Scan(_))));
    }
}
