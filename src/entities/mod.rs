pub mod company;
pub mod genre;
pub mod history;
pub mod history_tag;
pub mod movie;
pub mod movie_company;
pub mod movie_genre;
pub mod movie_person;
pub mod movie_rating;
pub mod person;
pub mod tag;
pub mod user;
