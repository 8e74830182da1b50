use thiserror::Error;

/// Fatal valuation failures surfaced to the caller.
///
/// Display strings are the user-facing Russian messages shown by the
/// marketplace; callers branch on the variant and render the message as-is.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValuationError {
    #[error("Финансовые данные не найдены в анкете.")]
    MissingFinancialData,

    #[error("Не указана выручка за последний фактический период.")]
    MissingOrZeroRevenue,

    #[error("Для финансового сектора необходимо указать чистую прибыль.")]
    MissingNetProfit,

    #[error("Не удалось рассчитать оценку. Проверьте введённые данные (выручка и прибыль/маржа).")]
    EstimateFailed,
}
