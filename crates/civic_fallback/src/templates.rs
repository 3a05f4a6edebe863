//! Canned answers per service category.

use civic_core::ServiceCategory;

const UNEMPLOYMENT: &[&str] = &[
    "To apply for unemployment benefits in NYC, visit the NY Department of Labor website at labor.ny.gov. You'll need your Social Security number, employment history, and reason for job separation. The application typically takes 30 minutes to complete online.",
    "Unemployment benefits processing usually takes 2-3 weeks. You can check your claim status online or by calling 1-888-209-8124. Make sure to certify weekly to continue receiving benefits.",
    "You can work part-time while receiving unemployment benefits, but you must report all earnings. Your benefits will be reduced based on your earnings, but you may still receive partial payments.",
];

const SNAP: &[&str] = &[
    "To apply for SNAP benefits in NYC, you can apply online through ACCESS NYC or visit a local SNAP center. You'll need proof of income, identity, and residency. Processing typically takes 30 days.",
    "SNAP benefits are loaded monthly on your EBT card. You can check your balance by calling 1-888-328-6399 or online through the ConnectEBT website. Benefits can be used at most grocery stores and farmers markets.",
    "SNAP income limits depend on household size. For a family of four, the monthly gross income limit is approximately $3,200. Different deductions may apply to reduce your countable income.",
];

const MEDICAID: &[&str] = &[
    "You can apply for Medicaid in NYC through the NY State of Health marketplace at nystateofhealth.ny.gov or by calling 1-855-355-5777. Medicaid enrollment is available year-round.",
    "Medicaid covers a wide range of services including doctor visits, hospital care, prescription drugs, and preventive care. Most services require no co-payment for Medicaid recipients.",
    "To renew your Medicaid coverage, you'll receive a renewal notice in the mail. You can renew online, by phone, or by mail. Keep your contact information updated to receive important notices.",
];

const CASH_ASSISTANCE: &[&str] = &[
    "To apply for Cash Assistance in NYC, visit your local Job Center or apply online through ACCESS NYC. You'll need to attend an interview and provide required documentation within 30 days.",
    "Cash Assistance includes Family Assistance and Safety Net Assistance programs. Eligibility depends on income, household size, and other factors. Most recipients must participate in work activities.",
    "You can work while receiving cash assistance, but you must report all income to your caseworker within 10 days. Work requirements and time limits may apply depending on your situation.",
];

const CHILDCARE: &[&str] = &[
    "To apply for child care subsidies in NYC, contact your local child care resource and referral agency or apply through the NYC Administration for Children's Services. Income limits apply based on family size.",
    "Child care subsidies can be used with approved providers including day care centers, family day care, and after-school programs. You may be required to pay a co-payment based on your income.",
    "To find approved child care providers, use the online database through the Office of Children and Family Services or contact your local resource agency for a list of providers in your area.",
];

const GENERAL: &[&str] = &[
    "For assistance with NYC services, you can visit nyc.gov or call 311 for general information and referrals to the appropriate city agencies.",
    "Many NYC services can be accessed online through the ACCESS NYC website, which provides applications and information for various benefit programs.",
    "For specific questions about eligibility and application processes, contact the relevant NYC agency directly or visit a local service center for in-person assistance.",
];

/// Canned answers for a category. Never empty.
pub fn templates_for(category: ServiceCategory) -> &'static [&'static str] {
    match category {
        ServiceCategory::Unemployment => UNEMPLOYMENT,
        ServiceCategory::Snap => SNAP,
        ServiceCategory::Medicaid => MEDICAID,
        ServiceCategory::CashAssistance => CASH_ASSISTANCE,
        ServiceCategory::Childcare => CHILDCARE,
        ServiceCategory::General => GENERAL,
    }
}
