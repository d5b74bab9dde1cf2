use std::cmp::Ordering;

use util::sorting::SortOrder;

// FUTURE implement `Display` and improve info logging
#[derive(Clone, serde::Serialize, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReportIssue {
    pub message: String,
    pub severity: IssueSeverity,
    pub kind: IssueKind,
}

#[derive(Clone, serde::Serialize, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum IssueSeverity {
    Severe,
    Warning,
}

#[derive(Clone, serde::Serialize, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum IssueKind {
    NoDispenses,
    InsufficientStock { stock: String },
    InsufficientSolvent { solvent: String },
    OverVolume { well: String },
    NegativeVolume { well: String },
}

/// Severity descending, then kind, then message.
pub fn sort_issues(issues: &mut [ReportIssue]) {
    issues.sort_by(|a, b| {
        let sort_orderings = &[
            ("severity", SortOrder::Desc),
            ("kind", SortOrder::Asc),
            ("message", SortOrder::Asc),
        ];

        sort_orderings
            .iter()
            .fold(Ordering::Equal, |acc, (mode, sort_order)| {
                if !matches!(acc, Ordering::Equal) {
                    return acc;
                }

                fn kind_ordinal(kind: &IssueKind) -> usize {
                    match kind {
                        IssueKind::NoDispenses => 0,
                        IssueKind::InsufficientStock {
                            ..
                        } => 1,
                        IssueKind::InsufficientSolvent {
                            ..
                        } => 2,
                        IssueKind::OverVolume {
                            ..
                        } => 3,
                        IssueKind::NegativeVolume {
                            ..
                        } => 4,
                    }
                }
                fn severity_ordinal(severity: &IssueSeverity) -> usize {
                    match severity {
                        IssueSeverity::Warning => 0,
                        IssueSeverity::Severe => 1,
                    }
                }

                let ordering = match *mode {
                    "kind" => {
                        let ordinal_ordering = kind_ordinal(&a.kind).cmp(&kind_ordinal(&b.kind));

                        match ordinal_ordering {
                            Ordering::Equal => match (&a.kind, &b.kind) {
                                (
                                    IssueKind::InsufficientStock {
                                        stock: stock_a,
                                    },
                                    IssueKind::InsufficientStock {
                                        stock: stock_b,
                                    },
                                ) => stock_a.cmp(stock_b),
                                (
                                    IssueKind::InsufficientSolvent {
                                        solvent: solvent_a,
                                    },
                                    IssueKind::InsufficientSolvent {
                                        solvent: solvent_b,
                                    },
                                ) => solvent_a.cmp(solvent_b),
                                (
                                    IssueKind::OverVolume {
                                        well: well_a,
                                    },
                                    IssueKind::OverVolume {
                                        well: well_b,
                                    },
                                )
                                | (
                                    IssueKind::NegativeVolume {
                                        well: well_a,
                                    },
                                    IssueKind::NegativeVolume {
                                        well: well_b,
                                    },
                                ) => well_a.cmp(well_b),
                                _ => ordinal_ordering,
                            },
                            _ => ordinal_ordering,
                        }
                    }
                    "message" => a.message.cmp(&b.message),
                    "severity" => severity_ordinal(&a.severity).cmp(&severity_ordinal(&b.severity)),
                    _ => unreachable!(),
                };

                sort_order.apply(ordering)
            })
    });
}

#[cfg(test)]
mod tests {
    use crate::issue::{sort_issues, IssueKind, IssueSeverity, ReportIssue};

    #[test]
    pub fn sort_by_severity_with_equal_message_and_kind() {
        // given
        let issue1 = ReportIssue {
            message: "EQUAL".to_string(),
            severity: IssueSeverity::Severe,
            kind: IssueKind::NoDispenses,
        };
        let issue2 = ReportIssue {
            message: "EQUAL".to_string(),
            severity: IssueSeverity::Warning,
            kind: IssueKind::NoDispenses,
        };

        let mut issues: Vec<ReportIssue> = vec![issue2.clone(), issue1.clone()];
        let expected_issues: Vec<ReportIssue> = vec![issue1.clone(), issue2.clone()];

        // when
        sort_issues(&mut issues);

        // then
        assert_eq!(&issues, &expected_issues);
    }

    #[test]
    pub fn sort_by_message_with_equal_severity_and_kind() {
        // given
        let issue1 = ReportIssue {
            message: "MESSAGE_1".to_string(),
            severity: IssueSeverity::Warning,
            kind: IssueKind::NoDispenses,
        };
        let issue2 = ReportIssue {
            message: "MESSAGE_2".to_string(),
            severity: IssueSeverity::Warning,
            kind: IssueKind::NoDispenses,
        };

        let mut issues: Vec<ReportIssue> = vec![issue2.clone(), issue1.clone()];
        let expected_issues: Vec<ReportIssue> = vec![issue1.clone(), issue2.clone()];

        // when
        sort_issues(&mut issues);

        // then
        assert_eq!(&issues, &expected_issues);
    }

    #[test]
    pub fn sort_by_kind_with_equal_message_and_severity() {
        // given
        let issue = |kind: IssueKind| ReportIssue {
            message: "EQUAL".to_string(),
            severity: IssueSeverity::Severe,
            kind,
        };
        let issue1 = issue(IssueKind::NoDispenses);
        let issue2 = issue(IssueKind::InsufficientStock {
            stock: "stock 1".to_string(),
        });
        let issue3 = issue(IssueKind::InsufficientStock {
            stock: "stock 2".to_string(),
        });
        let issue4 = issue(IssueKind::InsufficientSolvent {
            solvent: "water".to_string(),
        });
        let issue5 = issue(IssueKind::OverVolume {
            well: "A:1".to_string(),
        });
        let issue6 = issue(IssueKind::OverVolume {
            well: "A:2".to_string(),
        });
        let issue7 = issue(IssueKind::NegativeVolume {
            well: "A:1".to_string(),
        });

        let mut issues: Vec<ReportIssue> = vec![
            issue7.clone(),
            issue6.clone(),
            issue5.clone(),
            issue4.clone(),
            issue3.clone(),
            issue2.clone(),
            issue1.clone(),
        ];
        let expected_issues: Vec<ReportIssue> = vec![issue1, issue2, issue3, issue4, issue5, issue6, issue7];

        // when
        sort_issues(&mut issues);

        // then
        assert_eq!(&issues, &expected_issues);
    }
}
