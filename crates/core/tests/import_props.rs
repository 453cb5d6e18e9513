use std::collections::BTreeSet;

use leksika_core::import::parse;
use proptest::prelude::*;

fn arb_line() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("# comment".to_string()),
        "[A-Za-z]{0,6}".prop_map(|name| format!("TABLE: {name}")),
        "[A-Za-z]{0,6}".prop_map(|label| format!("UNIT: {label}")),
        "[A-Za-z]{0,6}".prop_map(|label| format!("category: {label}")),
        ("[a-z]{0,5}", "[a-z]{0,5}").prop_map(|(a, b)| format!("{a} - {b}")),
        ("[a-z]{1,5}", "[a-z]{1,5}").prop_map(|(a, b)| format!("{a}\t{b}")),
        "\\PC{0,20}",
    ]
}

proptest! {
    #[test]
    fn parse_is_total_on_arbitrary_text(text in "[\\PC\\n\\r\\t]*") {
        let outcome = parse(&text);
        prop_assert_eq!(outcome.line_count(), text.lines().count());
    }

    #[test]
    fn every_line_is_accounted_for(lines in prop::collection::vec(arb_line(), 0..40)) {
        let text = lines.join("\n");
        let outcome = parse(&text);
        prop_assert_eq!(outcome.line_count(), text.lines().count());
    }

    #[test]
    fn error_lines_point_at_source(lines in prop::collection::vec(arb_line(), 0..40)) {
        let text = lines.join("\n");
        let source: Vec<&str> = text.lines().collect();
        let outcome = parse(&text);

        let mut previous = 0;
        for error in &outcome.errors {
            prop_assert!(error.line >= 1);
            prop_assert!(error.line > previous);
            prop_assert_eq!(source[error.line - 1], error.content.as_str());
            previous = error.line;
        }
    }

    #[test]
    fn labels_match_emitted_records(lines in prop::collection::vec(arb_line(), 0..40)) {
        let outcome = parse(&lines.join("\n"));

        let units: BTreeSet<String> =
            outcome.records.iter().map(|r| r.unit().to_string()).collect();
        let categories: BTreeSet<String> =
            outcome.records.iter().map(|r| r.category().to_string()).collect();

        prop_assert_eq!(&outcome.units, &units);
        prop_assert_eq!(&outcome.categories, &categories);
        for record in &outcome.records {
            prop_assert!(!record.source_term().is_empty());
            prop_assert!(!record.target_term().is_empty());
        }
    }
}
