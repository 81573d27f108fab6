use super::*;

fn valid_state() -> FormState {
    FormState {
        name: "Al".into(),
        city: "toshkent".into(),
        phone: "+998 90 123 45 67".into(),
        subject: "matematika".into(),
    }
}

#[test]
fn empty_state_reports_every_field_when_subject_is_selectable() {
    let errors = validate(&FormState::default(), &FormProfile::regional());
    assert_eq!(errors.len(), 4);
    assert_eq!(errors.get(Field::Name), Some(NAME_REQUIRED));
    assert_eq!(errors.get(Field::City), Some(CITY_REQUIRED));
    assert_eq!(errors.get(Field::Phone), Some(PHONE_INCOMPLETE));
    assert_eq!(errors.get(Field::Subject), Some(SUBJECT_REQUIRED));
}

#[test]
fn empty_state_skips_fixed_subject() {
    let errors = validate(&FormState::default(), &FormProfile::campus());
    assert_eq!(errors.len(), 3);
    assert!(!errors.contains(Field::Subject));
}

#[test]
fn complete_state_is_valid() {
    assert!(validate(&valid_state(), &FormProfile::regional()).is_empty());
}

#[test]
fn single_character_name_is_too_short() {
    let state = FormState {
        name: "A".into(),
        ..valid_state()
    };
    let errors = validate(&state, &FormProfile::regional());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.get(Field::Name), Some(NAME_TOO_SHORT));
}

#[test]
fn whitespace_name_counts_as_missing() {
    let state = FormState {
        name: "   ".into(),
        ..valid_state()
    };
    let errors = validate(&state, &FormProfile::regional());
    assert_eq!(errors.get(Field::Name), Some(NAME_REQUIRED));
}

#[test]
fn name_length_counts_characters_not_bytes() {
    let state = FormState {
        name: " Ў ".into(),
        ..valid_state()
    };
    let errors = validate(&state, &FormProfile::regional());
    assert_eq!(errors.get(Field::Name), Some(NAME_TOO_SHORT));
}

#[test]
fn partial_phone_is_incomplete() {
    let state = FormState {
        phone: "+998 90 123 45 6".into(),
        ..valid_state()
    };
    let errors = validate(&state, &FormProfile::regional());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.get(Field::Phone), Some(PHONE_INCOMPLETE));
}

#[test]
fn validation_is_repeatable() {
    let state = FormState {
        city: String::new(),
        ..valid_state()
    };
    let first = validate(&state, &FormProfile::regional());
    let second = validate(&state, &FormProfile::regional());
    assert_eq!(first, second);
}

#[test]
fn clearing_one_field_leaves_others() {
    let mut errors = validate(&FormState::default(), &FormProfile::regional());
    assert!(errors.clear(Field::Phone));
    assert!(!errors.clear(Field::Phone));
    assert_eq!(errors.len(), 3);
}

#[test]
fn errors_serialize_as_field_map() {
    let errors = validate(&FormState::default(), &FormProfile::campus());
    let json = serde_json::to_value(&errors).expect("serialize");
    assert_eq!(json["city"], CITY_REQUIRED);
    assert!(json.get("subject").is_none());
}
