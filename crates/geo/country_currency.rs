/// ISO 3166 alpha-2 country code to ISO 4217 currency code. Unknown
/// countries fall back to USD rather than failing preference resolution.
pub fn currency_for_country(country_code: &str) -> &'static str {
    match country_code.trim().to_ascii_uppercase().as_str() {
        "AE" => "AED",
        "AR" => "ARS",
        "AU" => "AUD",
        "BD" => "BDT",
        "BR" => "BRL",
        "CA" => "CAD",
        "CH" => "CHF",
        "CL" => "CLP",
        "CN" => "CNY",
        "CO" => "COP",
        "CZ" => "CZK",
        "DK" => "DKK",
        "EG" => "EGP",
        "ET" => "ETB",
        "GB" => "GBP",
        "GH" => "GHS",
        "HK" => "HKD",
        "HU" => "HUF",
        "ID" => "IDR",
        "IL" => "ILS",
        "IN" => "INR",
        "JP" => "JPY",
        "KE" => "KES",
        "KR" => "KRW",
        "MA" => "MAD",
        "MX" => "MXN",
        "MY" => "MYR",
        "NG" => "NGN",
        "NO" => "NOK",
        "NZ" => "NZD",
        "PH" => "PHP",
        "PK" => "PKR",
        "PL" => "PLN",
        "RW" => "RWF",
        "SA" => "SAR",
        "SE" => "SEK",
        "SG" => "SGD",
        "TH" => "THB",
        "TR" => "TRY",
        "TW" => "TWD",
        "TZ" => "TZS",
        "UG" => "UGX",
        "VN" => "VND",
        "ZA" => "ZAR",
        // Eurozone members resolve to the shared currency.
        "AT" | "BE" | "CY" | "DE" | "EE" | "ES" | "FI" | "FR" | "GR" | "HR" | "IE" | "IT"
        | "LT" | "LU" | "LV" | "MT" | "NL" | "PT" | "SI" | "SK" => "EUR",
        _ => "USD",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_countries() {
        assert_eq!(currency_for_country("UG"), "UGX");
        assert_eq!(currency_for_country("ke"), "KES");
        assert_eq!(currency_for_country("DE"), "EUR");
        assert_eq!(currency_for_country("US"), "USD");
    }

    #[test]
    fn unknown_countries_default_to_usd() {
        assert_eq!(currency_for_country("ZZ"), "USD");
        assert_eq!(currency_for_country(""), "USD");
    }
}
