mod binary;
mod console;
