use serde::{Deserialize, Serialize};
use crate::funding::accrual::PublishedFunding;
use crate::impact::accrual::PublishedImpact;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingRateUpdated {
    pub source: RateSource,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateSource {
    Skew,
    Explicit,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingPublished {
    pub published: PublishedFunding,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactPublished {
    pub published: PublishedImpact,
}
