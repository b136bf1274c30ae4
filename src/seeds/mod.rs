pub mod products_seed;
