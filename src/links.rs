//! Public link resolution for proof uploads and on-chain transactions.

/// Resolves a stored proof-of-payment object key to a public URL.
#[must_use]
pub fn proof_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key.trim_start_matches('/'))
}

/// Picks a block explorer URL for a transaction hash by the payment
/// method label. Matching is case-insensitive and substring-based, so
/// labels like `"USDT (TRC20)"` or `"Ethereum (ERC-20)"` resolve.
/// Returns `None` for unrecognized methods.
#[must_use]
pub fn explorer_url(tx_hash: &str, method_label: &str) -> Option<String> {
    let label = method_label.to_lowercase();
    if label.contains("eth") || label.contains("erc") {
        Some(format!("https://etherscan.io/tx/{tx_hash}"))
    } else if label.contains("bsc") || label.contains("bep") || label.contains("binance") {
        Some(format!("https://bscscan.com/tx/{tx_hash}"))
    } else if label.contains("tron") || label.contains("trc") {
        Some(format!("https://tronscan.org/#/transaction/{tx_hash}"))
    } else if label.contains("btc") || label.contains("bitcoin") {
        Some(format!("https://www.blockchain.com/btc/tx/{tx_hash}"))
    } else {
        None
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn proof_url_joins_without_doubling_slashes() {
        assert_eq!(
            proof_url("https://cdn.example.com/proofs/", "/2024/abc.png"),
            "https://cdn.example.com/proofs/2024/abc.png"
        );
        assert_eq!(
            proof_url("https://cdn.example.com/proofs", "2024/abc.png"),
            "https://cdn.example.com/proofs/2024/abc.png"
        );
    }

    #[test]
    fn explorer_matches_by_substring() {
        assert_eq!(
            explorer_url("0xabc", "Ethereum (ERC-20)").as_deref(),
            Some("https://etherscan.io/tx/0xabc")
        );
        assert_eq!(
            explorer_url("0xdef", "BSC / BEP-20").as_deref(),
            Some("https://bscscan.com/tx/0xdef")
        );
        assert_eq!(
            explorer_url("T123", "USDT (TRC20)").as_deref(),
            Some("https://tronscan.org/#/transaction/T123")
        );
        assert_eq!(
            explorer_url("deadbeef", "Bitcoin").as_deref(),
            Some("https://www.blockchain.com/btc/tx/deadbeef")
        );
    }

    #[test]
    fn explorer_is_case_insensitive() {
        assert!(explorer_url("0xabc", "ETHEREUM").is_some());
        assert!(explorer_url("T123", "trc20").is_some());
    }

    #[test]
    fn unknown_method_yields_none() {
        assert_eq!(explorer_url("0xabc", "Bank Transfer"), None);
        assert_eq!(explorer_url("0xabc", ""), None);
    }
}
