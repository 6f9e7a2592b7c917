pub mod onebusaway;
