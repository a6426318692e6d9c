pub mod helpscout;
