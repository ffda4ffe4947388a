//! Product-specific data for notification templates and prompts.
//!
//! Every product has one extraction function in [`REGISTRY`]. Several fields
//! are estimates: a monetary total divided by an assumed average operation
//! size stands in for an event count the logs do not carry. The divisors are
//! the named `AVG_*` constants below. If the event logs ever gain real counts,
//! those should replace these estimates.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::catalog::Product;
use crate::models::ClientProfile;

pub const LOCAL_CURRENCY: &str = "KZT";
pub const FOREIGN_CURRENCY_PLACEHOLDER: &str = "foreign currency";

pub const TAXI: &str = "Taxi";
pub const TRAVEL: &str = "Travel";
pub const HOTELS: &str = "Hotels";
pub const RESTAURANTS: &str = "Restaurants";
pub const COSMETICS: &str = "Cosmetics & Perfume";
pub const JEWELRY: &str = "Jewelry";
pub const EATING_AT_HOME: &str = "Eating at home";
pub const WATCHING_AT_HOME: &str = "Watching at home";
pub const PLAYING_AT_HOME: &str = "Playing at home";
const DEFAULT_TOP_CATEGORIES: [&str; 3] = ["Groceries", RESTAURANTS, TAXI];

pub const AVG_TAXI_FARE: f64 = 2_000.0;
pub const AVG_ATM_WITHDRAWAL: f64 = 50_000.0;
pub const AVG_P2P_TRANSFER: f64 = 100_000.0;
pub const AVG_FX_OPERATION: f64 = 1_000_000.0;
pub const AVG_LOAN_PAYMENT: f64 = 100_000.0;
pub const FX_ACTIVITY_UNIT: f64 = 500_000.0;
pub const AVG_DEPOSIT_OPERATION: f64 = 200_000.0;
pub const AVG_TOPUP: f64 = 100_000.0;
pub const AVG_INVEST_OPERATION: f64 = 200_000.0;
pub const AVG_GOLD_OPERATION: f64 = 500_000.0;

pub const RESERVE_FOR_DEPOSIT: f64 = 50_000.0;
pub const RESERVE_FOR_INVESTING: f64 = 100_000.0;
pub const STABLE_BALANCE: f64 = 500_000.0;
pub const REGULAR_SAVER_TOPUPS: f64 = 500_000.0;
pub const HIGH_LIQUIDITY_BALANCE: f64 = 1_000_000.0;
pub const YOUNG_INVESTOR_AGE: u32 = 35;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BaseFields {
    pub client_code: i64,
    pub name: String,
    pub status: String,
    pub age: u32,
    pub city: String,
    pub avg_monthly_balance: i64,
    pub currencies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TravelCardFields {
    pub taxi_rides_count: i64,
    pub taxi_spent_amount: f64,
    pub travel_spent_amount: f64,
    pub hotels_spent_amount: f64,
    pub month: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PremiumCardFields {
    pub restaurants_spent: f64,
    pub cosmetics_spent: f64,
    pub jewelry_spent: f64,
    pub atm_withdrawals_count: i64,
    pub transfers_count: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreditCardFields {
    pub top_category_1: String,
    pub top_category_2: String,
    pub top_category_3: String,
    pub online_services_spent: f64,
    pub installment_payments: bool,
    pub cc_repayments: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CurrencyExchangeFields {
    pub fx_buy_count: i64,
    pub fx_sell_count: i64,
    pub main_foreign_currency: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CashLoanFields {
    pub monthly_inflow: f64,
    pub monthly_outflow: f64,
    pub loan_payments_count: i64,
    pub low_balance_days: i64,
    pub cash_need_indicators: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MultiCurrencyDepositFields {
    pub free_balance: f64,
    pub fx_activity_score: i64,
    pub foreign_spending: f64,
    pub deposit_fx_topup_count: i64,
    pub deposit_fx_withdraw_count: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SavingsDepositFields {
    pub stable_balance: f64,
    pub spending_volatility: i64,
    pub deposit_topup_count: i64,
    pub deposit_withdraw_count: i64,
    pub balance_stability_score: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AccumulativeDepositFields {
    pub regular_balance: f64,
    pub periodic_topups: bool,
    pub topup_frequency: i64,
    pub savings_behavior_score: i64,
    pub small_regular_amounts: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InvestmentsFields {
    pub available_funds: f64,
    pub invest_in_count: i64,
    pub invest_out_count: i64,
    pub investment_interest_score: i64,
    pub risk_tolerance: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GoldBarsFields {
    pub high_liquidity: bool,
    pub gold_buy_count: i64,
    pub gold_sell_count: i64,
    pub jewelry_spent: f64,
    pub value_preservation_interest: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ProductFields {
    TravelCard(TravelCardFields),
    PremiumCard(PremiumCardFields),
    CreditCard(CreditCardFields),
    CurrencyExchange(CurrencyExchangeFields),
    CashLoan(CashLoanFields),
    MultiCurrencyDeposit(MultiCurrencyDepositFields),
    SavingsDeposit(SavingsDepositFields),
    AccumulativeDeposit(AccumulativeDepositFields),
    Investments(InvestmentsFields),
    GoldBars(GoldBarsFields),
}

/// Base fields plus the product's own fields, serialized as one flat object.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProductData {
    #[serde(skip)]
    pub product: Option<Product>,
    #[serde(flatten)]
    pub base: BaseFields,
    #[serde(flatten)]
    pub fields: Option<ProductFields>,
}

impl ProductData {
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

pub type Extractor = fn(&ClientProfile, NaiveDate) -> ProductFields;

pub const REGISTRY: [(Product, Extractor); 10] = [
    (Product::TravelCard, travel_card),
    (Product::PremiumCard, premium_card),
    (Product::CreditCard, credit_card),
    (Product::CurrencyExchange, currency_exchange),
    (Product::CashLoan, cash_loan),
    (Product::MultiCurrencyDeposit, multi_currency_deposit),
    (Product::SavingsDeposit, savings_deposit),
    (Product::AccumulativeDeposit, accumulative_deposit),
    (Product::Investments, investments),
    (Product::GoldBars, gold_bars),
];

pub fn extractor_for(product: Product) -> Option<Extractor> {
    REGISTRY
        .iter()
        .find(|(registered, _)| *registered == product)
        .map(|(_, extractor)| *extractor)
}

pub fn extract(profile: &ClientProfile, product_name: &str) -> ProductData {
    extract_on(profile, product_name, Local::now().date_naive())
}

/// Like [`extract`], with the month taken from `today`.
pub fn extract_on(profile: &ClientProfile, product_name: &str, today: NaiveDate) -> ProductData {
    let product = Product::from_name(product_name);
    if product.is_none() && !product_name.is_empty() {
        tracing::debug!(product_name, "unknown product, extracting base fields only");
    }
    let fields = product
        .and_then(extractor_for)
        .map(|extractor| extractor(profile, today));
    ProductData {
        product,
        base: base_fields(profile),
        fields,
    }
}

pub fn base_fields(profile: &ClientProfile) -> BaseFields {
    let info = &profile.client_info;
    let currencies = if profile.currencies_used.is_empty() {
        vec![LOCAL_CURRENCY.to_string()]
    } else {
        profile.currencies_used.iter().cloned().collect()
    };
    BaseFields {
        client_code: info.client_code,
        name: info.name.clone(),
        status: info.status.clone(),
        age: info.age,
        city: info.city.clone(),
        avg_monthly_balance: profile.avg_monthly_balance.round() as i64,
        currencies,
    }
}

fn amount(totals: &BTreeMap<String, f64>, key: &str) -> f64 {
    totals.get(key).copied().unwrap_or(0.0)
}

/// Estimated number of operations behind a monetary total.
fn estimate_count(total: f64, average_size: f64) -> i64 {
    (total / average_size).trunc() as i64
}

fn travel_card(profile: &ClientProfile, today: NaiveDate) -> ProductFields {
    let categories = &profile.category_spending;
    let taxi = amount(categories, TAXI);
    ProductFields::TravelCard(TravelCardFields {
        taxi_rides_count: estimate_count(taxi, AVG_TAXI_FARE),
        taxi_spent_amount: taxi,
        travel_spent_amount: amount(categories, TRAVEL),
        hotels_spent_amount: amount(categories, HOTELS),
        month: today.format("%B").to_string(),
    })
}

fn premium_card(profile: &ClientProfile, _today: NaiveDate) -> ProductFields {
    let categories = &profile.category_spending;
    let types = &profile.type_spending;
    ProductFields::PremiumCard(PremiumCardFields {
        restaurants_spent: amount(categories, RESTAURANTS),
        cosmetics_spent: amount(categories, COSMETICS),
        jewelry_spent: amount(categories, JEWELRY),
        atm_withdrawals_count: estimate_count(amount(types, "atm_withdrawal"), AVG_ATM_WITHDRAWAL),
        transfers_count: estimate_count(amount(types, "p2p_out"), AVG_P2P_TRANSFER),
    })
}

fn credit_card(profile: &ClientProfile, _today: NaiveDate) -> ProductFields {
    let categories = &profile.category_spending;
    let top = crate::aggregate::top_entries(categories, 3);
    let top_category = |index: usize| {
        top.get(index)
            .map(|(name, _)| name.to_string())
            .unwrap_or_else(|| DEFAULT_TOP_CATEGORIES[index].to_string())
    };
    ProductFields::CreditCard(CreditCardFields {
        top_category_1: top_category(0),
        top_category_2: top_category(1),
        top_category_3: top_category(2),
        online_services_spent: amount(categories, EATING_AT_HOME)
            + amount(categories, WATCHING_AT_HOME)
            + amount(categories, PLAYING_AT_HOME),
        installment_payments: profile.type_spending.contains_key("installment_payment_out"),
        cc_repayments: profile.type_spending.contains_key("cc_repayment_out"),
    })
}

fn currency_exchange(profile: &ClientProfile, _today: NaiveDate) -> ProductFields {
    let types = &profile.type_spending;
    let main_foreign_currency = profile
        .currencies_used
        .iter()
        .find(|currency| currency.as_str() != LOCAL_CURRENCY)
        .cloned()
        .unwrap_or_else(|| FOREIGN_CURRENCY_PLACEHOLDER.to_string());
    ProductFields::CurrencyExchange(CurrencyExchangeFields {
        fx_buy_count: estimate_count(amount(types, "fx_buy"), AVG_FX_OPERATION),
        fx_sell_count: estimate_count(amount(types, "fx_sell"), AVG_FX_OPERATION),
        main_foreign_currency,
    })
}

fn cash_loan(profile: &ClientProfile, _today: NaiveDate) -> ProductFields {
    let types = &profile.type_spending;
    let inflow = amount(types, "salary_in");
    let outflow = amount(types, "card_out");
    ProductFields::CashLoan(CashLoanFields {
        monthly_inflow: inflow,
        monthly_outflow: outflow,
        loan_payments_count: estimate_count(amount(types, "loan_payment_out"), AVG_LOAN_PAYMENT),
        low_balance_days: if outflow > inflow * 1.2 { 15 } else { 5 },
        cash_need_indicators: outflow > inflow * 1.1,
    })
}

fn multi_currency_deposit(profile: &ClientProfile, _today: NaiveDate) -> ProductFields {
    let categories = &profile.category_spending;
    let types = &profile.type_spending;
    ProductFields::MultiCurrencyDeposit(MultiCurrencyDepositFields {
        free_balance: (profile.avg_monthly_balance - RESERVE_FOR_DEPOSIT).max(0.0),
        fx_activity_score: estimate_count(amount(types, "fx_buy"), FX_ACTIVITY_UNIT).min(10),
        foreign_spending: amount(categories, TRAVEL) + amount(categories, HOTELS),
        deposit_fx_topup_count: estimate_count(
            amount(types, "deposit_fx_topup_out"),
            AVG_DEPOSIT_OPERATION,
        ),
        deposit_fx_withdraw_count: estimate_count(
            amount(types, "deposit_fx_withdraw_in"),
            AVG_DEPOSIT_OPERATION,
        ),
    })
}

fn savings_deposit(profile: &ClientProfile, _today: NaiveDate) -> ProductFields {
    let balance = profile.avg_monthly_balance;
    let stable = balance > STABLE_BALANCE;
    ProductFields::SavingsDeposit(SavingsDepositFields {
        stable_balance: balance,
        spending_volatility: if stable { 3 } else { 7 },
        deposit_topup_count: estimate_count(
            amount(&profile.type_spending, "deposit_topup_out"),
            AVG_DEPOSIT_OPERATION,
        ),
        // Savings deposits allow no withdrawals.
        deposit_withdraw_count: 0,
        balance_stability_score: if stable { 9 } else { 5 },
    })
}

fn accumulative_deposit(profile: &ClientProfile, _today: NaiveDate) -> ProductFields {
    let topups = amount(&profile.type_spending, "deposit_topup_out");
    ProductFields::AccumulativeDeposit(AccumulativeDepositFields {
        regular_balance: profile.avg_monthly_balance,
        periodic_topups: topups > 0.0,
        topup_frequency: estimate_count(topups, AVG_TOPUP),
        savings_behavior_score: if topups > REGULAR_SAVER_TOPUPS { 8 } else { 4 },
        small_regular_amounts: topups < REGULAR_SAVER_TOPUPS,
    })
}

fn investments(profile: &ClientProfile, _today: NaiveDate) -> ProductFields {
    let types = &profile.type_spending;
    let invest_in = amount(types, "invest_in");
    ProductFields::Investments(InvestmentsFields {
        available_funds: (profile.avg_monthly_balance - RESERVE_FOR_INVESTING).max(0.0),
        invest_in_count: estimate_count(invest_in, AVG_INVEST_OPERATION),
        invest_out_count: estimate_count(amount(types, "invest_out"), AVG_INVEST_OPERATION),
        investment_interest_score: if invest_in > 0.0 { 8 } else { 3 },
        risk_tolerance: if profile.client_info.age < YOUNG_INVESTOR_AGE { 7 } else { 5 },
    })
}

fn gold_bars(profile: &ClientProfile, _today: NaiveDate) -> ProductFields {
    let types = &profile.type_spending;
    let bought = amount(types, "gold_buy_out");
    ProductFields::GoldBars(GoldBarsFields {
        high_liquidity: profile.avg_monthly_balance > HIGH_LIQUIDITY_BALANCE,
        gold_buy_count: estimate_count(bought, AVG_GOLD_OPERATION),
        gold_sell_count: estimate_count(amount(types, "gold_sell_in"), AVG_GOLD_OPERATION),
        jewelry_spent: amount(&profile.category_spending, JEWELRY),
        value_preservation_interest: if bought > 0.0 { 8 } else { 5 },
    })
}
