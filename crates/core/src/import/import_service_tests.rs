#[cfg(test)]
mod tests {
    use crate::errors::Error;
    use crate::import::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    fn service() -> ImportService {
        ImportService::default()
    }

    fn import_error(err: Error) -> ImportError {
        match err {
            Error::Import(e) => e,
            other => panic!("expected an import error, got {:?}", other),
        }
    }

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        RawRow::from_pairs(pairs.iter().copied())
    }

    const GENERIC_CSV: &str = "Symbol,Shares,Cost Basis,Purchase Date\n\
                               AAPL,100,150.00,2024-01-15\n\
                               MSFT,-5,300.00,2024-01-20\n\
                               T,10,17.00,2024-02-01";

    // ============================================================================
    // End-to-end scenarios
    // ============================================================================

    #[test]
    fn test_csv_mixed_valid_and_error_rows() {
        let text = "Symbol,Shares,Cost Basis,Purchase Date\nAAPL,100,150.00,2024-01-15\nMSFT,-5,300.00,2024-01-20";
        let session = service()
            .start_session(ImportMethod::Csv, text, today())
            .unwrap();

        assert_eq!(session.records.len(), 2);

        let first = &session.records[0];
        assert_eq!(first.status, RecordStatus::Valid);
        assert_eq!(first.symbol, "AAPL");
        assert_eq!(first.shares, Some(dec!(100)));
        assert_eq!(first.cost_basis, Some(dec!(150.00)));

        let second = &session.records[1];
        assert_eq!(second.status, RecordStatus::Error);
        assert_eq!(second.messages, vec![MSG_INVALID_SHARES]);

        assert_eq!(
            session.summary,
            ImportSummary {
                total_records: 2,
                valid_records: 1,
                records_with_errors: 1,
                records_with_warnings: 0,
            }
        );
    }

    #[test]
    fn test_json_portfolio_symbol_is_normalized() {
        let text = r#"{"portfolio":[{"symbol":"jepi","shares":200,"costBasis":55,"purchaseDate":"2024-02-01"}]}"#;
        let session = service()
            .start_session(ImportMethod::Json, text, today())
            .unwrap();

        assert_eq!(session.records.len(), 1);
        assert_eq!(session.records[0].symbol, "JEPI");
        assert_eq!(session.records[0].status, RecordStatus::Valid);
        assert_eq!(session.records[0].shares, Some(dec!(200)));
    }

    #[test]
    fn test_pasted_future_purchase_date() {
        let text = "Symbol\tShares\tCost Basis\tPurchase Date\nO\t10\t60\t2099-01-01";
        let session = service()
            .start_session(ImportMethod::Paste, text, today())
            .unwrap();

        assert_eq!(session.records[0].status, RecordStatus::Error);
        assert_eq!(session.records[0].messages, vec![MSG_INVALID_PURCHASE_DATE]);
    }

    #[test]
    fn test_missing_shares_column_fails_every_row() {
        let text = "Symbol,Cost Basis,Purchase Date\nAAPL,150,2024-01-15\nO,60,2024-02-01";
        let session = service()
            .start_session(ImportMethod::Csv, text, today())
            .unwrap();

        assert_eq!(session.mapping.confidence(CanonicalField::Shares), 0.0);
        assert_eq!(session.records.len(), 2);
        for record in &session.records {
            assert_eq!(record.status, RecordStatus::Error);
            assert_eq!(
                record.messages,
                vec!["Required column not mapped: shares".to_string()]
            );
            assert_eq!(record.cost_basis, None);
        }
    }

    #[test]
    fn test_case_insensitive_duplicate() {
        let text = "Symbol,Shares,Cost Basis,Purchase Date\nT,10,17,2024-01-02\nt,5,18,2024-01-03";
        let session = service()
            .start_session(ImportMethod::Csv, text, today())
            .unwrap();

        assert_eq!(session.records[0].status, RecordStatus::Valid);
        assert_eq!(session.records[1].status, RecordStatus::Warning);
        assert_eq!(session.records[1].messages, vec![MSG_DUPLICATE_SYMBOL]);
    }

    #[test]
    fn test_broker_export_is_detected_and_translated() {
        let text = "DATE,SYMBOL,QUANTITY,PRICE\n2024-01-10,ko,50,58.25";
        let session = service()
            .start_session(ImportMethod::Broker(None), text, today())
            .unwrap();

        assert_eq!(session.detected_broker, Some(Broker::TdAmeritrade));
        assert_eq!(
            session.headers,
            vec!["Purchase Date", "Symbol", "Shares", "Cost Basis"]
        );
        assert_eq!(session.records[0].status, RecordStatus::Valid);
        assert_eq!(session.records[0].symbol, "KO");
    }

    #[test]
    fn test_row_shape_warning_is_attached_to_its_record() {
        let text = "Symbol,Shares,Cost Basis,Purchase Date,Notes\n\
                    AAPL,100,150,2024-01-15\n\
                    O,10,60,2024-02-01,monthly payer";
        let session = service()
            .start_session(ImportMethod::Csv, text, today())
            .unwrap();

        assert_eq!(session.read_warnings.len(), 1);
        assert_eq!(session.records[0].status, RecordStatus::Warning);
        assert!(session.records[0].messages[0].contains("Missing columns left empty"));
        assert_eq!(session.records[1].status, RecordStatus::Valid);
        assert_eq!(session.records[1].notes.as_deref(), Some("monthly payer"));
    }

    // ============================================================================
    // Input-level failures
    // ============================================================================

    #[test]
    fn test_input_level_errors() {
        let err = service()
            .start_session(ImportMethod::Csv, " \n ", today())
            .unwrap_err();
        assert_eq!(import_error(err), ImportError::EmptyInput);

        let err = service()
            .start_session(ImportMethod::Json, "{not json", today())
            .unwrap_err();
        assert!(matches!(import_error(err), ImportError::MalformedJson(_)));

        let err = service()
            .start_session(ImportMethod::Json, r#"{"holdings":[]}"#, today())
            .unwrap_err();
        assert!(matches!(import_error(err), ImportError::UnexpectedShape(_)));
    }

    #[test]
    fn test_limits_are_enforced() {
        let small = ImportService::new(ImportConfig {
            max_rows: 2,
            max_bytes: 1024,
            ..Default::default()
        });

        let err = small
            .start_session(ImportMethod::Csv, GENERIC_CSV, today())
            .unwrap_err();
        assert_eq!(
            import_error(err),
            ImportError::TooManyRows { count: 3, limit: 2 }
        );

        let big = "x".repeat(2048);
        let err = small
            .read_source(ImportMethod::Csv, &big)
            .unwrap_err();
        assert_eq!(
            import_error(err),
            ImportError::InputTooLarge {
                size: 2048,
                limit: 1024
            }
        );
    }

    #[test]
    fn test_header_only_input_gives_empty_session() {
        let session = service()
            .start_session(ImportMethod::Csv, "Symbol,Shares,Cost Basis,Purchase Date\n", today())
            .unwrap();

        assert!(session.records.is_empty());
        assert_eq!(session.summary, ImportSummary::default());
    }

    // ============================================================================
    // Session operations
    // ============================================================================

    #[test]
    fn test_revise_row_recomputes_only_that_record() {
        let svc = service();
        let session = svc
            .start_session(ImportMethod::Csv, GENERIC_CSV, today())
            .unwrap();
        assert_eq!(session.summary.records_with_errors, 1);

        let revised = svc
            .revise_row(
                session.clone(),
                1,
                row(&[
                    ("Symbol", "MSFT"),
                    ("Shares", "5"),
                    ("Cost Basis", "300.00"),
                    ("Purchase Date", "2024-01-20"),
                ]),
            )
            .unwrap();

        assert_eq!(revised.records[1].status, RecordStatus::Valid);
        assert_eq!(revised.records[1].shares, Some(dec!(5)));
        assert_eq!(revised.records[0], session.records[0]);
        assert_eq!(revised.records[2], session.records[2]);
        assert_eq!(revised.rows[1].get("Shares"), Some("5"));
        assert_eq!(revised.summary.valid_records, 3);
        assert_eq!(revised.summary.records_with_errors, 0);
        // The input session is untouched.
        assert_eq!(session.records[1].status, RecordStatus::Error);
    }

    #[test]
    fn test_revise_row_checks_earlier_duplicates() {
        let svc = service();
        let session = svc
            .start_session(ImportMethod::Csv, GENERIC_CSV, today())
            .unwrap();

        let revised = svc
            .revise_row(
                session,
                2,
                row(&[
                    ("Symbol", "aapl"),
                    ("Shares", "1"),
                    ("Cost Basis", "190"),
                    ("Purchase Date", "2024-03-01"),
                ]),
            )
            .unwrap();

        assert_eq!(revised.records[2].status, RecordStatus::Warning);
        assert_eq!(revised.records[2].messages, vec![MSG_DUPLICATE_SYMBOL]);
    }

    #[test]
    fn test_revise_row_clears_row_shape_warning() {
        let svc = service();
        let text = "Symbol,Shares,Cost Basis,Purchase Date\nAAPL,100,150\n";
        let session = svc.start_session(ImportMethod::Csv, text, today()).unwrap();
        assert_eq!(session.records[0].status, RecordStatus::Error);
        assert_eq!(session.read_warnings.len(), 1);

        let revised = svc
            .revise_row(
                session,
                0,
                row(&[
                    ("Symbol", "AAPL"),
                    ("Shares", "100"),
                    ("Cost Basis", "150"),
                    ("Purchase Date", "2024-01-15"),
                ]),
            )
            .unwrap();

        assert!(revised.read_warnings.is_empty());
        assert_eq!(revised.records[0].status, RecordStatus::Valid);
    }

    #[test]
    fn test_revise_row_out_of_range() {
        let svc = service();
        let session = svc
            .start_session(ImportMethod::Csv, GENERIC_CSV, today())
            .unwrap();

        let err = svc.revise_row(session, 3, RawRow::new()).unwrap_err();
        assert_eq!(
            import_error(err),
            ImportError::RowOutOfRange { index: 3, len: 3 }
        );
    }

    #[test]
    fn test_remap_revalidates_every_row() {
        let svc = service();
        let text = "Ticker,Units,Paid,When\nAAPL,100,150,2024-01-15\nO,10,60,2024-02-01";
        let session = svc.start_session(ImportMethod::Csv, text, today()).unwrap();
        assert_eq!(
            session.mapping.missing_required(),
            vec![CanonicalField::CostBasis, CanonicalField::PurchaseDate]
        );
        assert_eq!(session.summary.records_with_errors, 2);

        let mut mapping = session.mapping.clone();
        mapping.assign(CanonicalField::CostBasis, Some("Paid")).unwrap();
        mapping.assign(CanonicalField::PurchaseDate, Some("When")).unwrap();

        let remapped = svc.remap(session, mapping, today()).unwrap();
        assert_eq!(remapped.summary.valid_records, 2);
        assert_eq!(remapped.records[1].cost_basis, Some(dec!(60)));
        assert_eq!(
            remapped.mapping.confidence(CanonicalField::Symbol),
            1.0
        );
    }

    #[test]
    fn test_remap_rejects_unknown_column() {
        let svc = service();
        let session = svc
            .start_session(ImportMethod::Csv, GENERIC_CSV, today())
            .unwrap();

        let mut mapping = session.mapping.clone();
        mapping.headers.push("Quantity".to_string());
        mapping.assign(CanonicalField::Shares, Some("Quantity")).unwrap();

        let err = svc.remap(session, mapping, today()).unwrap_err();
        assert_eq!(
            import_error(err),
            ImportError::UnknownColumn("Quantity".to_string())
        );
    }

    #[test]
    fn test_records_with_status_filter() {
        let text = "Symbol,Shares,Cost Basis,Purchase Date\nT,10,17,2024-01-02\nt,5,18,2024-01-03\nX,0,1,2024-01-01";
        let session = service()
            .start_session(ImportMethod::Csv, text, today())
            .unwrap();

        assert_eq!(session.records_with_status(StatusFilter::All).len(), 3);
        assert_eq!(session.records_with_status(StatusFilter::Valid)[0].row_index, 0);
        assert_eq!(session.records_with_status(StatusFilter::Warning)[0].row_index, 1);
        assert_eq!(session.records_with_status(StatusFilter::Error)[0].row_index, 2);
        assert!(session.has_errors());
        assert!(session.has_warnings());
    }

    // ============================================================================
    // Commit policy
    // ============================================================================

    fn mixed_session() -> ImportSession {
        let text = "Symbol,Shares,Cost Basis,Purchase Date\nT,10,17,2024-01-02\nt,5,18,2024-01-03\nX,0,1,2024-01-01";
        service()
            .start_session(ImportMethod::Csv, text, today())
            .unwrap()
    }

    #[test]
    fn test_commit_policy_allow_includes_warnings() {
        let holdings = service()
            .committable(&mixed_session(), WarningPolicy::Allow)
            .unwrap();

        assert_eq!(holdings.len(), 2);
        assert_eq!(holdings[0].symbol, "T");
        assert_eq!(holdings[1].shares, dec!(5));
    }

    #[test]
    fn test_commit_policy_skip_excludes_warnings() {
        let holdings = service()
            .committable(&mixed_session(), WarningPolicy::Skip)
            .unwrap();

        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].cost_basis, dec!(17));
    }

    #[test]
    fn test_commit_policy_block_refuses_warnings() {
        let err = service()
            .committable(&mixed_session(), WarningPolicy::Block)
            .unwrap_err();
        assert_eq!(import_error(err), ImportError::UnacknowledgedWarnings(1));

        let clean = service()
            .start_session(
                ImportMethod::Csv,
                "Symbol,Shares,Cost Basis,Purchase Date\nO,10,60,2024-02-01\nX,0,1,2024-01-01",
                today(),
            )
            .unwrap();
        let holdings = service()
            .committable(&clean, WarningPolicy::Block)
            .unwrap();
        assert_eq!(holdings.len(), 1);
    }
}
