use ai_quotient::workflows::assessment::{AnswerSheet, AnswerSheetError, QuestionCatalog};

#[test]
fn sample_sheet_covers_the_builtin_catalog() {
    let data = include_bytes!("../fixtures/sample_answers.csv");
    let sheet = AnswerSheet::from_reader(&data[..]).expect("sample sheet parses");
    let catalog = QuestionCatalog::ai_quotient();

    assert_eq!(sheet.len(), catalog.question_count());
    for section in catalog.sections() {
        for question in &section.questions {
            let entry = sheet
                .answer_for(&question.id)
                .expect("every question has an answer");
            assert!(
                question.option(&entry.option_id).is_some(),
                "option {} belongs to {}",
                entry.option_id,
                question.id
            );
        }
    }
}

#[test]
fn later_rows_override_earlier_ones() {
    let csv = "question_id,option_id\n\
data-quality,data-quality-1\n\
 data-access , data-access-2 \n\
data-quality,data-quality-4\n";

    let sheet = AnswerSheet::from_reader(csv.as_bytes()).expect("sheet parses");
    assert_eq!(sheet.len(), 3);
    assert_eq!(
        sheet.answer_for("data-quality").map(|entry| entry.option_id.as_str()),
        Some("data-quality-4")
    );
    assert_eq!(
        sheet.answer_for("data-access").map(|entry| entry.option_id.as_str()),
        Some("data-access-2")
    );
    assert!(sheet.answer_for("governance-policy").is_none());
}

#[test]
fn blank_cells_are_reported_with_row_numbers() {
    let csv = "question_id,option_id\n\
data-quality,data-quality-1\n\
data-access,\n";

    let err = AnswerSheet::from_reader(csv.as_bytes()).expect_err("missing option rejected");
    match err {
        AnswerSheetError::MissingValue { row, column } => {
            assert_eq!(row, 3);
            assert_eq!(column, "option_id");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn empty_sheet_has_no_entries() {
    let sheet = AnswerSheet::from_reader("question_id,option_id\n".as_bytes()).expect("parses");
    assert!(sheet.is_empty());
    assert!(sheet.entries().is_empty());
}

#[test]
fn missing_file_is_an_io_error() {
    let err = AnswerSheet::from_path("does/not/exist.csv").expect_err("no such file");
    assert!(matches!(err, AnswerSheetError::Io(_)));
}
