use crate::api::Binder;
use crate::config::BindConfig;
use crate::convert::OptionItem;
use crate::field::{FieldKind, FieldRegistry};
use crate::source::InMemorySource;
use crate::tree::{FieldId, FieldTree, Form};
use crate::value::{Value, ValueKind};
use tracing_subscriber::EnvFilter;

/// Installs a fmt subscriber honoring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Field kinds used across tests.
pub fn registry() -> FieldRegistry {
    FieldRegistry::builder()
        .register(
            FieldKind::builder("percent", ValueKind::Integer)
                .min(0i64)
                .max(100i64)
                .default_value(0i64)
                .build(),
        )
        .register(
            FieldKind::builder("name", ValueKind::Text)
                .required()
                .min_len(2)
                .max_len(20)
                .build(),
        )
        .register(
            FieldKind::builder("color", ValueKind::Choice)
                .choices(vec![
                    OptionItem::new("red", "Red"),
                    OptionItem::new("green", "Green"),
                ])
                .build(),
        )
        .register(
            FieldKind::builder("total", ValueKind::Integer)
                .compute(|lookup, id| {
                    let sum: i64 = lookup
                        .children(id)
                        .iter()
                        .filter_map(|c| lookup.value(*c).as_i64())
                        .sum();
                    Value::Integer(sum)
                })
                .build(),
        )
        .build()
}

/// A small form wired to an in-memory source:
///
/// ```text
/// order
/// ├── customer        (name)
/// ├── color           (color)
/// └── total           (total, sum of its children)
///     ├── first       (percent)
///     └── second      (percent, bound to "lines.second")
/// ```
pub struct FormFixture {
    pub binder: Binder<InMemorySource>,
    pub customer: FieldId,
    pub color: FieldId,
    pub total: FieldId,
    pub first: FieldId,
    pub second: FieldId,
}

impl Default for FormFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl FormFixture {
    pub fn new() -> Self {
        Self::with_config(BindConfig::default())
    }

    pub fn with_config(config: BindConfig) -> Self {
        let registry = registry();
        let kind = |name: &str| registry.get(name).expect("fixture kind registered");

        let mut form = Form::new("order");
        let root = form.root();
        let customer = form.add_field(root, "customer", kind("name")).unwrap();
        let color = form.add_field(root, "color", kind("color")).unwrap();
        let total = form.add_field(root, "total", kind("total")).unwrap();
        let first = form.add_field(total, "first", kind("percent")).unwrap();
        let second = form.add_field(total, "second", kind("percent")).unwrap();
        form.bind(second, "lines.second").unwrap();

        let source = InMemorySource::new().with("lines.second", Value::Integer(10));
        let binder = Binder::new(form, source, config).expect("fixture binder");
        Self {
            binder,
            customer,
            color,
            total,
            first,
            second,
        }
    }
}
