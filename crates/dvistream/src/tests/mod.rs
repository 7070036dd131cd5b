
mod property_brackets;
