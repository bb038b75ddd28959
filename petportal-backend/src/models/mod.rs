//! Domain types shared by the database layer, the chat service and controllers

mod adoption;
mod chat;
mod notification;
mod pet;
mod registration;
mod session;
mod user;

pub use adoption::{AdoptionAction, AdoptionRequest, AdoptionRequestDetail, CreateAdoptionRequest};
pub use chat::{
    ChatMessage, Conversation, ConversationDetail, ConversationSummary, MessageView,
};
pub use notification::{NewNotification, Notification};
pub use pet::{
    NewPet, Pet, PetGender, PetInput, PetListing, PetStatus, Species, FOUND_TO_ADOPTION_DAYS,
};
pub use registration::{NewRegistrationRequest, PetRegistrationRequest, RegistrationPetStatus, ReviewStatus};
pub use session::Session;
pub use user::{
    AdminProfile, AdminRegisterRequest, LoginRequest, PasswordResetConfirmRequest,
    PasswordResetRequest, ProfileGender, RegisterRequest, User, UserOverview, UserProfile,
    UserSummary, MAX_ADMIN_PROFILES,
};
