use fluent::{bundle::FluentBundle, FluentArgs, FluentResource, FluentValue};
use intl_memoizer::concurrent::IntlLangMemoizer;
use tracing::warn;

static FLUENT_EN: &str = include_str!("../locales/en.ftl");

/// Fluent locale loader to localize text.
///
/// Unknown locales fallback to English.
pub struct FluentLoader {
    bundle: FluentBundle<FluentResource, IntlLangMemoizer>,
}

impl FluentLoader {
    pub fn new(locale: &str) -> Self {
        let mut bundle = FluentBundle::new_concurrent(vec![locale.parse().unwrap_or_default()]);
        // No unicode isolation marks around placeables in HTML.
        bundle.set_use_isolating(false);

        let source = match locale {
            "en" => FLUENT_EN,
            _ => {
                warn!("Locale `{locale}` is not supported, fallback to `en`");
                FLUENT_EN
            }
        };
        match FluentResource::try_new(source.to_owned()) {
            Ok(resource) => {
                if let Err(errors) = bundle.add_resource(resource) {
                    warn!("Fluent resource has conflicts: {errors:?}");
                }
            }
            Err((_, errors)) => warn!("Invalid fluent resource: {errors:?}"),
        }
        FluentLoader { bundle }
    }

    /// Format the message of `key`, `number` is passed as the `$count` argument.
    ///
    /// Return the key itself if the message doesn't exist.
    pub fn format(&self, key: &str, number: Option<i64>) -> String {
        let Some(pattern) = self.bundle.get_message(key).and_then(|msg| msg.value()) else {
            warn!("Missing fluent message `{key}`");
            return key.to_owned();
        };

        let args = number.map(|number| {
            let mut args = FluentArgs::new();
            args.set("count", FluentValue::from(number));
            args
        });
        let mut errors = vec![];
        self.bundle
            .format_pattern(pattern, args.as_ref(), &mut errors)
            .into_owned()
    }
}
