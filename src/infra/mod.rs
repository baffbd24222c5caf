pub mod metam;
