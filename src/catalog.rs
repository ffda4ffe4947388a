//! The fixed catalog of ten banking products.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Product {
    TravelCard,
    PremiumCard,
    CreditCard,
    CurrencyExchange,
    CashLoan,
    MultiCurrencyDeposit,
    SavingsDeposit,
    AccumulativeDeposit,
    Investments,
    GoldBars,
}

impl Product {
    pub const ALL: [Product; 10] = [
        Product::TravelCard,
        Product::PremiumCard,
        Product::CreditCard,
        Product::CurrencyExchange,
        Product::CashLoan,
        Product::MultiCurrencyDeposit,
        Product::SavingsDeposit,
        Product::AccumulativeDeposit,
        Product::Investments,
        Product::GoldBars,
    ];

    /// Canonical spelling used in output records and prompts.
    pub fn name(self) -> &'static str {
        match self {
            Product::TravelCard => "Travel card",
            Product::PremiumCard => "Premium card",
            Product::CreditCard => "Credit card",
            Product::CurrencyExchange => "Currency exchange",
            Product::CashLoan => "Cash loan",
            Product::MultiCurrencyDeposit => "Multi-currency deposit",
            Product::SavingsDeposit => "Savings deposit",
            Product::AccumulativeDeposit => "Accumulative deposit",
            Product::Investments => "Investments",
            Product::GoldBars => "Gold bars",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Product::TravelCard => {
                "4% cashback on travel, 4% cashback on taxis, trains and flights. \
                 Visa Signature privileges."
            }
            Product::PremiumCard => {
                "2-4% cashback depending on deposit size. Boosted cashback on jewelry, \
                 perfume and restaurants. Free withdrawals and transfers."
            }
            Product::CreditCard => {
                "Credit limit up to 2M ₸, up to 10% cashback in chosen categories, \
                 3-24 month installments."
            }
            Product::CurrencyExchange => {
                "Favourable in-app exchange rate with no commission 24/7, \
                 automatic purchase at a target rate."
            }
            Product::CashLoan => {
                "No collateral or paperwork, online approval, 12-21% rate, \
                 early repayment without penalties."
            }
            Product::MultiCurrencyDeposit => {
                "14.50% rate, KZT/USD/RUB/EUR support, free top-ups and withdrawals."
            }
            Product::SavingsDeposit => {
                "16.50% rate, KDIF deposit protection, no top-ups or withdrawals until term end."
            }
            Product::AccumulativeDeposit => "15.50% rate, top-ups allowed, no withdrawals.",
            Product::Investments => {
                "0% commission on trades, entry from 6 ₸, no fees in the first year."
            }
            Product::GoldBars => {
                "999.9 fineness bars, buy and sell at branches, storage in safe deposit boxes."
            }
        }
    }

    pub fn key_features(self) -> &'static [&'static str] {
        match self {
            Product::TravelCard => &["travel_cashback", "transport_cashback", "visa_signature"],
            Product::PremiumCard => &["high_balance_benefits", "luxury_cashback", "free_transfers"],
            Product::CreditCard => &["credit_line", "category_cashback", "installments"],
            Product::CurrencyExchange => &["multi_currency", "no_commission", "auto_exchange"],
            Product::CashLoan => &["no_collateral", "quick_approval", "flexible_repayment"],
            Product::MultiCurrencyDeposit => {
                &["multi_currency_deposit", "flexible_access", "currency_rebalancing"]
            }
            Product::SavingsDeposit => &["highest_rate", "deposit_protection", "fixed_term"],
            Product::AccumulativeDeposit => &["accumulation", "regular_deposits", "good_rate"],
            Product::Investments => &["zero_commission", "low_entry", "beginner_friendly"],
            Product::GoldBars => &["physical_gold", "value_preservation", "bank_storage"],
        }
    }

    pub fn target_audience(self) -> &'static [&'static str] {
        match self {
            Product::TravelCard => {
                &["frequent_traveler", "hotel_booker", "high_transport_spending"]
            }
            Product::PremiumCard => &["high_balance", "luxury_spending", "frequent_transfers"],
            Product::CreditCard => {
                &["credit_user", "category_optimizer", "installment_buyer"]
            }
            Product::CurrencyExchange => {
                &["multi_currency_user", "forex_trader", "international_business"]
            }
            Product::CashLoan => {
                &["quick_cash_need", "no_collateral_available", "online_preferring"]
            }
            Product::MultiCurrencyDeposit => {
                &["multi_currency_saver", "flexible_access_need", "currency_diversifier"]
            }
            Product::SavingsDeposit => {
                &["long_term_saver", "maximum_yield_seeker", "capital_preserver"]
            }
            Product::AccumulativeDeposit => {
                &["regular_saver", "goal_oriented_saver", "discipline_builder"]
            }
            Product::Investments => &["investor", "small_investor", "investment_beginner"],
            Product::GoldBars => {
                &["gold_investor", "diversification_seeker", "long_term_preserver"]
            }
        }
    }

    /// Names the product was published under before the English catalog.
    fn legacy_names(self) -> &'static [&'static str] {
        match self {
            Product::TravelCard => &["Карта для путешествий"],
            Product::PremiumCard => &["Премиальная карта"],
            Product::CreditCard => &["Кредитная карта"],
            Product::CurrencyExchange => &["Обмен валют"],
            Product::CashLoan => &["Кредит наличными"],
            Product::MultiCurrencyDeposit => {
                &["Депозит мультивалютный", "Multicurrency deposit"]
            }
            Product::SavingsDeposit => &["Депозит сберегательный"],
            Product::AccumulativeDeposit => &["Депозит накопительный"],
            Product::Investments => &["Инвестиции"],
            Product::GoldBars => &["Золотые слитки"],
        }
    }

    /// Resolves any accepted spelling to its catalog entry.
    ///
    /// Matching ignores case and surrounding whitespace, so "Savings Deposit"
    /// and "savings deposit" both land on [`Product::SavingsDeposit`].
    pub fn from_name(raw: &str) -> Option<Product> {
        let wanted = raw.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        Product::ALL.into_iter().find(|product| {
            product.name().to_lowercase() == wanted
                || product
                    .legacy_names()
                    .iter()
                    .any(|legacy| legacy.to_lowercase() == wanted)
        })
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
