use std::time::Duration;

use serde_json::Value;

use crate::catalog::Product;
use crate::error::{PipelineError, Result};
use crate::extract::{ProductData, ProductFields, FOREIGN_CURRENCY_PLACEHOLDER};
use crate::llm::{generate_with_timeout, SharedGenerator};
use crate::text::{first_json_object, group_thousands, strip_code_fence};

const NOTIFICATION_TEMPERATURE: f32 = 0.7;
const TRAVEL_CASHBACK_RATE: f64 = 0.04;
const NOTABLE_SPEND: f64 = 100_000.0;
const PREMIUM_BALANCE: i64 = 1_000_000;

const OBSERVATIONS: [&str; 5] = [
    "we noticed that",
    "we can see that",
    "it looks like",
    "we've noticed that",
    "your spending shows that",
];

const SYSTEM_PROMPT: &str = "You write short push notifications for a retail bank. \
Reply with a JSON object {\"push_notification\": \"...\"} and nothing else.";

pub enum NotificationFormatter {
    Template,
    Llm { generator: SharedGenerator, timeout: Duration },
}

impl NotificationFormatter {
    pub fn llm(generator: SharedGenerator, timeout: Duration) -> Self {
        NotificationFormatter::Llm { generator, timeout }
    }

    pub async fn format(&self, data: &ProductData) -> Result<String> {
        match self {
            NotificationFormatter::Template => Ok(render_template(data)),
            NotificationFormatter::Llm { generator, timeout } => {
                let prompt = notification_prompt(data)?;
                let reply = generate_with_timeout(
                    generator.as_ref(),
                    SYSTEM_PROMPT,
                    &prompt,
                    NOTIFICATION_TEMPERATURE,
                    *timeout,
                )
                .await?;
                parse_notification(&reply)
            }
        }
    }
}

pub fn failure_placeholder(product_name: &str) -> String {
    if product_name.is_empty() {
        "Notification generation failed".to_string()
    } else {
        format!("Notification generation failed for {product_name}")
    }
}

fn money(amount: f64) -> String {
    format!("{} ₸", group_thousands(amount, ' '))
}

fn pick<'a>(options: &[&'a str], client_code: i64) -> &'a str {
    let index = client_code.rem_euclid(options.len() as i64) as usize;
    options[index]
}

fn cta_variants(product: Option<Product>) -> &'static [&'static str] {
    match product {
        Some(Product::TravelCard) => &["Open the card in the app", "Get a travel card"],
        Some(Product::PremiumCard) => &["Upgrade to Premium", "Open a premium card"],
        Some(Product::CreditCard) => &["Get your credit card", "Apply in the app"],
        Some(Product::CurrencyExchange) => &["Set up an exchange", "Try it in the app"],
        Some(Product::CashLoan) => &["Check your limit", "Apply in two minutes"],
        Some(Product::MultiCurrencyDeposit)
        | Some(Product::SavingsDeposit)
        | Some(Product::AccumulativeDeposit) => &["Open a deposit", "Start saving"],
        Some(Product::Investments) => &["Open an account", "Start investing"],
        Some(Product::GoldBars) => &["Buy gold bars", "Learn more"],
        None => &["Learn more", "See details in the app"],
    }
}

/// Renders a notification from fixed wording and the extracted fields.
///
/// Phrase variants are chosen from the client code, so the same input always
/// renders the same text.
pub fn render_template(data: &ProductData) -> String {
    let base = &data.base;
    let name = &base.name;
    let observation = pick(&OBSERVATIONS, base.client_code);
    let cta = pick(cta_variants(data.product), base.client_code);

    let Some(fields) = &data.fields else {
        return format!("{name}, {observation} we have a special offer for you. {cta}.");
    };

    match fields {
        ProductFields::TravelCard(f) => {
            if f.taxi_spent_amount > NOTABLE_SPEND || f.travel_spent_amount > NOTABLE_SPEND {
                let cashback = (f.taxi_spent_amount + f.travel_spent_amount + f.hotels_spent_amount)
                    * TRAVEL_CASHBACK_RATE;
                format!(
                    "{name}, {observation} in {} you took {} taxi rides for {}. With a travel \
                     card about {} would have come back as cashback. {cta}.",
                    f.month,
                    f.taxi_rides_count,
                    money(f.taxi_spent_amount),
                    money(cashback)
                )
            } else {
                format!(
                    "{name}, {observation} you travel and take taxis often. A travel card gives \
                     cashback on every trip. {cta}."
                )
            }
        }
        ProductFields::PremiumCard(f) => {
            if base.avg_monthly_balance > PREMIUM_BALANCE {
                if f.cosmetics_spent > NOTABLE_SPEND || f.jewelry_spent > NOTABLE_SPEND {
                    format!(
                        "{name}, {observation} you keep a high balance and shop for cosmetics and \
                         jewelry. A premium card gives up to 4% cashback in these categories. \
                         {cta}."
                    )
                } else {
                    format!(
                        "{name}, {observation} you keep a steady high balance. A premium card \
                         gives up to 4% cashback and free withdrawals. {cta}."
                    )
                }
            } else {
                format!(
                    "{name}, {observation} you spend {} in restaurants. A premium card gives \
                     boosted cashback and free withdrawals. {cta}.",
                    money(f.restaurants_spent)
                )
            }
        }
        ProductFields::CreditCard(f) => format!(
            "{name}, {observation} you mostly spend on {}, {} and {}. A credit card gives up to \
             10% cashback in your favourite categories. {cta}.",
            f.top_category_1.to_lowercase(),
            f.top_category_2.to_lowercase(),
            f.top_category_3.to_lowercase()
        ),
        ProductFields::CurrencyExchange(f) => {
            if f.main_foreign_currency != FOREIGN_CURRENCY_PLACEHOLDER {
                format!(
                    "{name}, {observation} you often pay in {}. Exchange in the app at a good \
                     rate and set auto-buy at your target rate. {cta}.",
                    f.main_foreign_currency
                )
            } else if f.fx_buy_count > 0 {
                format!(
                    "{name}, {observation} you exchange currency regularly. The app offers a good \
                     rate and auto-buy at your target rate. {cta}."
                )
            } else {
                format!(
                    "{name}, {observation} you may need {FOREIGN_CURRENCY_PLACEHOLDER} soon. \
                     Exchange in the app with no commission, 24/7. {cta}."
                )
            }
        }
        ProductFields::CashLoan(_) => format!(
            "{name}, {observation} you may have larger expenses ahead. If you need a cushion, a \
             cash loan with flexible repayments is available. {cta}."
        ),
        ProductFields::MultiCurrencyDeposit(f) => format!(
            "{name}, {observation} you have {} of free funds. A multi-currency deposit earns \
             interest and keeps money in several currencies. {cta}.",
            money(f.free_balance)
        ),
        ProductFields::SavingsDeposit(f) => format!(
            "{name}, {observation} you keep a stable balance of {}. A savings deposit gives the \
             top rate in exchange for no withdrawals. {cta}.",
            money(f.stable_balance)
        ),
        ProductFields::AccumulativeDeposit(_) => format!(
            "{name}, {observation} you put money aside regularly. An accumulative deposit helps \
             it grow at a higher rate. {cta}."
        ),
        ProductFields::Investments(f) => format!(
            "{name}, {observation} you have {} available. Investing starts from a low entry with \
             zero commission in the first year. {cta}.",
            money(f.available_funds)
        ),
        ProductFields::GoldBars(_) => format!(
            "{name}, {observation} your funds are highly liquid. Gold bars are a reliable way to \
             diversify. {cta}."
        ),
    }
}

fn tone_for(age: u32, status: &str) -> &'static str {
    let status = status.to_lowercase();
    if status.contains("student") || age < 25 {
        "friendly and informal, addressing the client as a peer"
    } else if status.contains("premium") {
        "respectful and concise, highlighting exclusivity"
    } else {
        "warm and professional"
    }
}

pub fn notification_prompt(data: &ProductData) -> Result<String> {
    let product = data.product.map(Product::name).unwrap_or("a bank offer");
    let description = data.product.map(Product::description).unwrap_or("");
    let fields = serde_json::to_string_pretty(data)?;
    Ok(format!(
        "Write a personalized push notification offering \"{product}\".\n\
         Product: {description}\n\n\
         Client data (amounts in KZT, counts are estimates):\n{fields}\n\n\
         Guidelines:\n\
         - Address the client by first name; tone: {tone}.\n\
         - Mention one or two concrete details from the data, phrased as an observation \
         (\"we noticed\", \"we can see\").\n\
         - 180-220 characters, at most one exclamation mark, no CAPS.\n\
         - Write amounts with space-grouped thousands and the ₸ sign.\n\
         - End with exactly one short call to action.\n\n\
         Return JSON: {{\"push_notification\": \"...\"}}",
        tone = tone_for(data.base.age, &data.base.status),
    ))
}

/// Reads the notification text from a reply, tolerating code fences and bare text.
pub fn parse_notification(reply: &str) -> Result<String> {
    let body = strip_code_fence(reply);
    if let Some(object) = first_json_object(body) {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(object) {
            return match map.get("push_notification") {
                Some(Value::String(text)) if !text.trim().is_empty() => {
                    Ok(text.trim().to_string())
                }
                _ => Err(PipelineError::MalformedResponse(
                    "reply has no push_notification text".to_string(),
                )),
            };
        }
    }
    if body.is_empty() || body.starts_with('{') {
        return Err(PipelineError::MalformedResponse(
            "empty or unreadable notification reply".to_string(),
        ));
    }
    Ok(body.to_string())
}
