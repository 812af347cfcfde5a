use crate::{Currency, Decimal, Error, ErrorLevel, ErrorType, Source, Transaction};
use rust_decimal::RoundingStrategy;

/// Minor-unit precision used when an even split does not terminate.
const MIN_SCALE: u32 = 2;

impl Transaction {
    /// Fills in omitted currencies and amounts.
    ///
    /// The first explicit currency in posting order is the dominant one; when
    /// there is none, `default_currency` is used. Postings without a currency
    /// take the dominant currency. Then, per currency, whatever is needed to
    /// bring the sum to zero is split among the postings without an amount.
    /// Explicit currencies and amounts are never changed.
    ///
    /// Fails with [`ErrorType::Overflow`] when a currency's sum exceeds the
    /// range of [`Decimal`].
    pub fn finalize(&mut self, default_currency: &str) -> Result<(), Error> {
        let dominant = self
            .postings
            .iter()
            .find_map(|posting| posting.currency.clone())
            .unwrap_or_else(|| default_currency.to_string());
        for posting in self.postings.iter_mut() {
            if posting.currency.is_none() {
                posting.currency = Some(dominant.clone());
            }
        }

        for (currency, indices) in self.currency_groups() {
            let missing = indices
                .iter()
                .copied()
                .filter(|&i| self.postings[i].amount.is_none())
                .collect::<Vec<_>>();
            if missing.is_empty() {
                continue;
            }
            let explicit = indices
                .iter()
                .filter_map(|&i| self.postings[i].amount)
                .collect::<Vec<_>>();
            let scale = explicit
                .iter()
                .map(|amount| amount.scale())
                .max()
                .unwrap_or(0)
                .max(MIN_SCALE);
            let deficit = -explicit
                .iter()
                .try_fold(Decimal::ZERO, |sum, amount| sum.checked_add(*amount))
                .ok_or_else(|| overflow(&currency))?;
            log::debug!(
                "filling {} postings in {} with {}",
                missing.len(),
                currency,
                deficit
            );
            let shares = split(deficit, missing.len(), scale).ok_or_else(|| overflow(&currency))?;
            for (i, share) in missing.into_iter().zip(shares) {
                self.postings[i].amount = Some(share);
            }
        }
        Ok(())
    }

    /// Groups posting indices by currency, in order of first appearance.
    fn currency_groups(&self) -> Vec<(Currency, Vec<usize>)> {
        let mut groups: Vec<(Currency, Vec<usize>)> = Vec::new();
        for (i, posting) in self.postings.iter().enumerate() {
            let currency = posting.currency.clone().unwrap_or_default();
            match groups.iter_mut().find(|(c, _)| *c == currency) {
                Some((_, indices)) => indices.push(i),
                None => groups.push((currency, vec![i])),
            }
        }
        groups
    }
}

fn overflow(currency: &str) -> Error {
    Error {
        msg: format!("Amounts in {} are out of range.", currency),
        src: Source::default(),
        r#type: ErrorType::Overflow,
        level: ErrorLevel::Error,
    }
}

/// Splits `total` into `parts` amounts summing exactly to `total`.
///
/// An even split is used when it is exact. Otherwise every share is truncated
/// to `scale` decimal places and the last share takes the remainder. Returns
/// `None` on overflow.
fn split(total: Decimal, parts: usize, scale: u32) -> Option<Vec<Decimal>> {
    if total.is_zero() {
        return Some(vec![Decimal::ZERO; parts]);
    }
    let count = Decimal::from(parts);
    let even = total.checked_div(count)?;
    if even.checked_mul(count) == Some(total) {
        return Some(vec![even; parts]);
    }
    let share = even.round_dp_with_strategy(scale, RoundingStrategy::ToZero);
    let rest = share.checked_mul(Decimal::from(parts - 1))?;
    let mut shares = vec![share; parts - 1];
    shares.push(total.checked_sub(rest)?);
    Some(shares)
}
