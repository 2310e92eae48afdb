use chrono::NaiveDate;
use fieldbind::command::{Command, CommandDecorator, ExceptionDecorator, Origin};
use fieldbind::convert::{converter_for, ConversionContext, Locale};
use fieldbind::messages::{Catalog, Message, MessageId, MessageLog, MessageSink, Severity};
use fieldbind::source::{DataSource, InMemorySource};
use fieldbind::state::CacheKind;
use fieldbind::validate::RuleSet;
use fieldbind::{
    BindConfig, BindError, Binder, FieldId, FieldKind, FieldRegistry, FieldTree, Form,
    SetOutcome, Value, ValueContainer, ValueKind,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

fn registry() -> FieldRegistry {
    FieldRegistry::builder()
        .register(
            FieldKind::builder("percent", ValueKind::Integer)
                .min(0i64)
                .max(100i64)
                .default_value(0i64)
                .build(),
        )
        .register(
            FieldKind::builder("code", ValueKind::Text)
                .min_len(3)
                .max_len(5)
                .build(),
        )
        .register(
            FieldKind::builder("even", ValueKind::Integer)
                .bean(Arc::new(
                    RuleSet::new()
                        .rule("positive", "must be positive", |v| {
                            Ok(v.as_i64().map(|n| n > 0).unwrap_or(true))
                        })
                        .rule("even", "must be even", |v| {
                            Ok(v.as_i64().map(|n| n % 2 == 0).unwrap_or(true))
                        }),
                ))
                .build(),
        )
        .register(
            FieldKind::builder("fragile", ValueKind::Integer)
                .bean(Arc::new(RuleSet::new().rule("remote", "unused", |_| {
                    Err("rule service unavailable".to_string())
                })))
                .build(),
        )
        .build()
}

fn setup() -> (Binder<InMemorySource>, FieldId, FieldId) {
    let registry = registry();
    let mut form = Form::new("form");
    let root = form.root();
    let score = form
        .add_field(root, "score", registry.get("percent").unwrap())
        .unwrap();
    let code = form
        .add_field(root, "code", registry.get("code").unwrap())
        .unwrap();
    let binder = Binder::new(form, InMemorySource::new(), BindConfig::default()).unwrap();
    (binder, score, code)
}

#[test]
fn test_out_of_range_integer_then_valid_commit() {
    let (mut binder, score, _) = setup();

    assert_eq!(binder.set_text(score, "150").unwrap(), SetOutcome::Invalid);
    let messages = binder.sink().for_field(score);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].key, "validation.too_high");
    assert_eq!(messages[0].text, "score must be at most 100");
    assert_eq!(binder.get_value(score).unwrap(), Value::Integer(0));
    assert!(!binder.is_changed(score).unwrap());

    assert_eq!(
        binder.set_text(score, "42").unwrap(),
        SetOutcome::Committed { changed: true }
    );
    assert_eq!(binder.get_value(score).unwrap(), Value::Integer(42));
    assert!(binder.is_changed(score).unwrap());
    assert!(binder.sink().for_field(score).is_empty());
}

#[test]
fn test_below_minimum_is_too_low() {
    let (mut binder, score, _) = setup();
    binder.set_text(score, "-1").unwrap();
    assert_eq!(binder.sink().for_field(score)[0].key, "validation.too_low");
}

#[test]
fn test_length_bounds() {
    let (mut binder, _, code) = setup();
    assert_eq!(binder.set_text(code, "ab").unwrap(), SetOutcome::Invalid);
    assert_eq!(binder.sink().for_field(code)[0].key, "validation.too_short");
    assert_eq!(binder.set_text(code, "abcdef").unwrap(), SetOutcome::Invalid);
    assert_eq!(binder.sink().for_field(code)[0].key, "validation.too_long");
    assert!(binder.set_text(code, "abcd").unwrap().is_committed());
    assert_eq!(binder.get_value(code).unwrap(), Value::text("abcd"));
}

#[test]
fn test_invalid_value_holds_rejected_container() {
    let (mut binder, score, _) = setup();
    binder.set_text(score, "10").unwrap();

    binder.set_text(score, "abc").unwrap();
    let invalid = binder.invalid_value(score).unwrap();
    assert_eq!(invalid.text(), Some("abc"));
    assert!(!invalid.has_value());
    assert_eq!(binder.get_value(score).unwrap(), Value::Integer(10));

    binder.set_text(score, "150").unwrap();
    let invalid = binder.invalid_value(score).unwrap();
    assert_eq!(invalid.text(), Some("150"));
    assert_eq!(invalid.value(), Some(&Value::Integer(150)));
    assert_eq!(binder.display_text(score).unwrap(), "150");

    binder.set_text(score, "20").unwrap();
    assert!(binder.invalid_value(score).is_none());
    assert_eq!(binder.display_text(score).unwrap(), "20");
}

#[test]
fn test_empty_value_skips_bounds() {
    let (mut binder, _, code) = setup();
    assert!(binder.set_text(code, "   ").unwrap().is_committed());
    assert_eq!(binder.get_value(code).unwrap(), Value::Null);
}

#[test]
fn test_bean_rules_report_every_violation() {
    let mut form = Form::new("form");
    let root = form.root();
    let n = form
        .add_field(root, "n", registry().get("even").unwrap())
        .unwrap();
    let mut binder = Binder::new(form, InMemorySource::new(), BindConfig::default()).unwrap();

    assert_eq!(binder.set_text(n, "-3").unwrap(), SetOutcome::Invalid);
    let texts: Vec<String> = binder
        .sink()
        .for_field(n)
        .iter()
        .map(|m| m.text.clone())
        .collect();
    assert_eq!(texts, vec!["n: must be positive", "n: must be even"]);
    assert!(binder.set_text(n, "4").unwrap().is_committed());
}

struct Claimer {
    seen: RefCell<Vec<String>>,
}

impl CommandDecorator for Claimer {
    fn exception_handler(&self) -> Option<&dyn ExceptionDecorator> {
        Some(self)
    }
}

impl ExceptionDecorator for Claimer {
    fn on_exception(&self, _cmd: &Command, err: &BindError) -> bool {
        self.seen.borrow_mut().push(err.to_string());
        true
    }
}

#[test]
fn test_rule_engine_failure_propagates_unless_claimed() {
    let mut form = Form::new("form");
    let root = form.root();
    let n = form
        .add_field(root, "n", registry().get("fragile").unwrap())
        .unwrap();
    let mut binder = Binder::new(form, InMemorySource::new(), BindConfig::default()).unwrap();

    match binder.set_text(n, "1") {
        Err(BindError::Rule(msg)) => assert!(msg.contains("rule service unavailable")),
        other => panic!("Expected Rule error, got {:?}", other),
    }

    let claimer = Rc::new(Claimer {
        seen: RefCell::new(Vec::new()),
    });
    binder.register_decorator(claimer.clone());
    assert_eq!(binder.set_text(n, "1").unwrap(), SetOutcome::FailureHandled);
    assert_eq!(claimer.seen.borrow().len(), 1);
}

/// Source that refuses every write.
struct BrokenSource;

impl DataSource for BrokenSource {
    fn read(&self, _path: &str) -> fieldbind::Result<Option<Value>> {
        Ok(None)
    }

    fn write(&mut self, path: &str, _value: Value) -> fieldbind::Result<()> {
        Err(BindError::Source(format!("cannot write {}", path)))
    }
}

#[test]
fn test_source_failure_goes_through_exception_hook() {
    let mut form = Form::new("form");
    let root = form.root();
    let score = form
        .add_field(root, "score", registry().get("percent").unwrap())
        .unwrap();
    form.bind(score, "score").unwrap();
    let mut binder = Binder::new(form, BrokenSource, BindConfig::default()).unwrap();

    assert!(matches!(
        binder.set_text(score, "5"),
        Err(BindError::Source(_))
    ));
    assert!(!binder.history().can_undo());
}

#[test]
fn test_clearing_caches_twice_is_a_no_op() {
    let (mut binder, score, _) = setup();
    binder.set_text(score, "5").unwrap();
    let root = binder.form().root();
    binder.clear_subtree(root, CacheKind::ALL).unwrap();
    let before = binder.sink().len();
    assert_eq!(binder.clear_subtree(root, CacheKind::ALL).unwrap(), 0);
    assert!(!binder.clear_cache(score, CacheKind::ALL).unwrap());
    assert_eq!(binder.clear_context_chain(score, true, CacheKind::ALL).unwrap(), 0);
    assert_eq!(binder.sink().len(), before);
    assert_eq!(binder.get_value(score).unwrap(), Value::Integer(5));
}

#[test]
fn test_untouched_fields_stay_uninitialized() {
    let (mut binder, score, code) = setup();
    binder.set_text(score, "5").unwrap();
    assert!(binder.form().is_initialized(score));
    assert!(!binder.form().is_initialized(code));
    assert!(binder.form().state(code).is_none());
}

#[test]
fn test_untrimmed_kind_keeps_whitespace() {
    let mut form = Form::new("form");
    let root = form.root();
    let kind = FieldKind::builder("raw", ValueKind::Text).trim(false).build();
    let raw = form.add_field(root, "raw", Arc::new(kind)).unwrap();
    let mut binder = Binder::new(form, InMemorySource::new(), BindConfig::default()).unwrap();
    binder.set_text(raw, "  padded ").unwrap();
    assert_eq!(binder.get_value(raw).unwrap(), Value::text("  padded "));
}

#[test]
fn test_date_failure_names_pattern() {
    let mut form = Form::new("form");
    let root = form.root();
    let kind = FieldKind::builder("date", ValueKind::Date)
        .pattern("%d.%m.%Y")
        .build();
    let birthday = form.add_field(root, "birthday", Arc::new(kind)).unwrap();
    let mut binder = Binder::new(form, InMemorySource::new(), BindConfig::default()).unwrap();

    assert!(binder.set_text(birthday, "24.12.1990").unwrap().is_committed());
    assert_eq!(
        binder.get_value(birthday).unwrap(),
        Value::Date(NaiveDate::from_ymd_opt(1990, 12, 24).unwrap())
    );

    assert_eq!(
        binder.set_text(birthday, "1990-12-24").unwrap(),
        SetOutcome::ConversionFailed
    );
    let errors = binder.sink().with_severity(Severity::Error);
    assert!(errors[0].text.contains("%d.%m.%Y"), "{}", errors[0].text);
    assert_eq!(errors[0].key, "conversion.pattern");
}

#[test]
fn test_round_trip_for_every_kind() {
    let ctxt = ConversionContext::new(
        "field",
        Locale::parse("de-DE"),
        chrono::FixedOffset::east_opt(3600).unwrap(),
        Arc::new(Catalog::new()),
    );
    let samples = vec![
        (ValueKind::Integer, Value::Integer(1_234_567)),
        (ValueKind::Decimal, Value::Decimal(-1234.5)),
        (ValueKind::Text, Value::text("grüße")),
        (ValueKind::Bool, Value::Bool(false)),
        (
            ValueKind::Date,
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()),
        ),
        (
            ValueKind::DateTime,
            Value::DateTime(
                NaiveDate::from_ymd_opt(2024, 2, 29)
                    .unwrap()
                    .and_hms_opt(23, 59, 1)
                    .unwrap(),
            ),
        ),
        (ValueKind::Choice, Value::Choice("blue".into())),
    ];
    for (kind, value) in samples {
        let conv = converter_for(kind, None);
        let text = conv.format(&value, &ctxt);
        assert_eq!(conv.parse(&text, &ctxt).unwrap(), value, "{:?} via {:?}", kind, text);
    }

    let lists = vec![
        (
            ValueKind::Decimal,
            Value::List(vec![Value::Decimal(1.5), Value::Decimal(-2.25)]),
        ),
        (
            ValueKind::Text,
            Value::List(vec![Value::text("a,b"), Value::text("c;d"), Value::text("e")]),
        ),
    ];
    for (element, value) in lists {
        let conv = converter_for(ValueKind::List, Some(element));
        let text = conv.format(&value, &ctxt);
        assert_eq!(conv.parse(&text, &ctxt).unwrap(), value, "list of {:?} via {:?}", element, text);
    }
}

#[test]
fn test_typed_value_of_wrong_kind_is_rejected() {
    let (mut binder, score, _) = setup();
    let container = ValueContainer::from_value(Value::text("not a number"));

    assert_eq!(
        binder.set_value(score, container.clone()).unwrap(),
        SetOutcome::ConversionFailed
    );
    assert_eq!(binder.get_value(score).unwrap(), Value::Integer(0));
    assert_eq!(binder.invalid_value(score), Some(&container));
    let messages = binder.sink().for_field(score);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].key, "conversion.kind");
    assert_eq!(messages[0].text, "score: 'not a number' is not a valid integer value");
    assert!(!binder.validate(score).unwrap().valid);
    assert!(!binder.history().can_undo());

    assert!(binder
        .set_value(score, ValueContainer::from_value(Value::Integer(42)))
        .unwrap()
        .is_committed());
    assert!(binder.invalid_value(score).is_none());
}

#[test]
fn test_typed_decimal_must_fit_the_pattern() {
    let mut form = Form::new("form");
    let root = form.root();
    let kind = FieldKind::builder("price", ValueKind::Decimal)
        .pattern("0.00")
        .build();
    let price = form.add_field(root, "price", Arc::new(kind)).unwrap();
    let mut binder = Binder::new(form, InMemorySource::new(), BindConfig::default()).unwrap();

    assert_eq!(
        binder
            .set_value(price, ValueContainer::from_value(Value::Decimal(2.555)))
            .unwrap(),
        SetOutcome::ConversionFailed
    );
    assert_eq!(binder.get_value(price).unwrap(), Value::Null);

    assert_eq!(binder.set_text(price, "2.555").unwrap(), SetOutcome::ConversionFailed);
    assert_eq!(binder.sink().for_field(price)[0].key, "conversion.pattern");

    assert!(binder
        .set_value(price, ValueContainer::from_value(Value::Integer(3)))
        .unwrap()
        .is_committed());
    assert_eq!(binder.get_value(price).unwrap(), Value::Decimal(3.0));
    assert_eq!(binder.display_text(price).unwrap(), "3.00");
}

#[test]
fn test_list_field_in_comma_decimal_locale() {
    let mut form = Form::new("form");
    let root = form.root();
    let kind = FieldKind::builder("weights", ValueKind::List)
        .element(ValueKind::Decimal)
        .build();
    let weights = form.add_field(root, "weights", Arc::new(kind)).unwrap();
    let config = BindConfig {
        locale: "de-DE".to_string(),
        ..Default::default()
    };
    let mut binder = Binder::new(form, InMemorySource::new(), config).unwrap();

    assert!(binder.set_text(weights, "1,5; 2,5").unwrap().is_committed());
    let expected = Value::List(vec![Value::Decimal(1.5), Value::Decimal(2.5)]);
    assert_eq!(binder.get_value(weights).unwrap(), expected);
    assert_eq!(binder.display_text(weights).unwrap(), "1,5; 2,5");
}

#[test]
fn test_typed_container_skips_conversion_but_not_validation() {
    let (mut binder, score, _) = setup();
    assert_eq!(
        binder
            .set_value(score, ValueContainer::from_value(Value::Integer(500)))
            .unwrap(),
        SetOutcome::Invalid
    );
    assert_eq!(binder.display_text(score).unwrap(), "500");
}

#[test]
fn test_message_sink_can_be_swapped() {
    #[derive(Default)]
    struct Counting {
        inner: MessageLog,
        posted: usize,
    }

    impl MessageSink for Counting {
        fn post(&mut self, message: Message) -> MessageId {
            self.posted += 1;
            self.inner.post(message)
        }

        fn dismiss(&mut self, id: MessageId) -> Option<Message> {
            self.inner.dismiss(id)
        }

        fn clear_field(&mut self, field: FieldId) {
            self.inner.clear_field(field)
        }
    }

    let mut form = Form::new("form");
    let root = form.root();
    let score = form
        .add_field(root, "score", registry().get("percent").unwrap())
        .unwrap();
    let mut binder =
        Binder::with_sink(form, InMemorySource::new(), Counting::default(), BindConfig::default())
            .unwrap();
    binder.set_text(score, "x").unwrap();
    binder.set_text(score, "999").unwrap();
    assert_eq!(binder.sink().posted, 2);
}

#[test]
fn test_origin_is_user_for_direct_edits() {
    struct Watch(RefCell<Vec<Origin>>);

    impl CommandDecorator for Watch {
        fn after(&self, _cmd: &Command, origin: Origin) {
            self.0.borrow_mut().push(origin);
        }
    }

    let (mut binder, score, _) = setup();
    let watch = Rc::new(Watch(RefCell::new(Vec::new())));
    binder.register_decorator(watch.clone());
    binder.set_text(score, "1").unwrap();
    binder.undo_next().unwrap();
    binder.redo_next().unwrap();
    assert_eq!(
        *watch.0.borrow(),
        vec![Origin::User, Origin::Undo, Origin::Redo]
    );
}
