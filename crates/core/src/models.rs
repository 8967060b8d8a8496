pub mod auth;
pub mod plan;
pub mod session;
pub mod subscription;
pub mod user;

pub use auth::{AuthToken, Registration};
pub use plan::{Plan, PlanDraft, PlanOrder};
pub use session::{BookedSlot, SelectedSession};
pub use subscription::{
    CompleteSubscriptionRequest, SessionRecord, Subscription, SubscriptionQuery, UserQuery,
};
pub use user::{AdminProfile, Gender, PersonalInfo, ProfileUpdate, RegistrationProfile, UserProfile};
