//! Tenant-scoped records: tasks, posts, comments, user profiles and the
//! records behind password login.
//!
//! Records carry no tenant id of their own. Inputs (`New*`, `*Patch`) carry
//! no tenant id either; the tenant always comes from the authorized context.

pub mod comment;
pub mod login;
pub mod post;
pub mod profile;
pub mod task;
mod validate;

pub use comment::{Comment, NewComment};
pub use login::{EmailClaim, PasswordLogin};
pub use post::{NewPost, Post, PostPatch};
pub use profile::{NewUserProfile, ProfileStatus, UserProfile, UserProfilePatch};
pub use task::{NewTask, Task, TaskPatch, TaskStatus};
pub use validate::email as normalize_email;
